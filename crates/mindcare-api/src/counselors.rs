use mindcare_types::models::Counselor;

/// Fixed in-memory counselor directory, built once at startup and read-only
/// for the life of the process. Booking rows store only the id; display
/// names are resolved through here.
pub struct CounselorDirectory {
    counselors: Vec<Counselor>,
}

impl CounselorDirectory {
    pub fn bundled() -> Self {
        Self {
            counselors: vec![
                Counselor {
                    id: 1,
                    name: "Dr. Priya Sharma".into(),
                    specialization: "Anxiety & Stress Management".into(),
                },
                Counselor {
                    id: 2,
                    name: "Dr. Rajesh Kumar".into(),
                    specialization: "Depression & Mood Support".into(),
                },
                Counselor {
                    id: 3,
                    name: "Dr. Meera Patel".into(),
                    specialization: "Academic & Life Stress".into(),
                },
            ],
        }
    }

    pub fn get(&self, id: i64) -> Option<&Counselor> {
        self.counselors.iter().find(|c| c.id == id)
    }

    pub fn name(&self, id: i64) -> Option<&str> {
        self.get(id).map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_ids() {
        let directory = CounselorDirectory::bundled();
        assert_eq!(directory.name(1), Some("Dr. Priya Sharma"));
        assert_eq!(directory.name(3), Some("Dr. Meera Patel"));
    }

    #[test]
    fn unknown_id_is_none() {
        let directory = CounselorDirectory::bundled();
        assert!(directory.get(99).is_none());
        assert!(directory.name(0).is_none());
    }
}
