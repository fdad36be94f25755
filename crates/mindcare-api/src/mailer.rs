use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{error, info, warn};

const SMTP_RELAY: &str = "smtp.gmail.com";

/// One-shot confirmation mail sender. Constructed once at startup; when the
/// credentials are absent (or unusable) it stays disabled and every send is
/// a logged no-op; booking success never depends on mail delivery.
pub struct Mailer {
    transport: Option<(SmtpTransport, Mailbox)>,
}

impl Mailer {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        let (Some(username), Some(password)) = (username, password) else {
            warn!("Mail credentials absent; booking confirmations disabled");
            return Self { transport: None };
        };

        let from: Mailbox = match format!("MindCare <{}>", username).parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                warn!("Mail username '{}' is not a valid address: {}", username, e);
                return Self { transport: None };
            }
        };

        let transport = match SmtpTransport::relay(SMTP_RELAY) {
            Ok(builder) => builder
                .credentials(Credentials::new(username, password))
                .build(),
            Err(e) => {
                warn!("SMTP relay setup failed: {}", e);
                return Self { transport: None };
            }
        };

        Self {
            transport: Some((transport, from)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Send the booking confirmation. Any failure is logged and swallowed;
    /// the booking was already persisted by the caller.
    pub async fn send_booking_confirmation(
        &self,
        to_name: &str,
        to_email: &str,
        counselor_name: &str,
        date: &str,
        time: &str,
    ) {
        let Some((transport, from)) = &self.transport else {
            return;
        };

        let to: Mailbox = match format!("{} <{}>", to_name, to_email).parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                warn!("Skipping confirmation mail, bad recipient '{}': {}", to_email, e);
                return;
            }
        };

        let body = format!(
            "Hi {},\n\nYour counselling appointment is confirmed.\n\n\
             Counsellor: {}\nDate: {}\nTime: {}\n\n\
             If you need to change it, just book a new slot.\n\n— MindCare",
            to_name, counselor_name, date, time
        );

        let email = match Message::builder()
            .from(from.clone())
            .to(to)
            .subject("Your MindCare appointment is confirmed")
            .body(body)
        {
            Ok(email) => email,
            Err(e) => {
                warn!("Could not build confirmation mail: {}", e);
                return;
            }
        };

        // SMTP send is blocking; run it off the async runtime. The handler
        // awaits the result, so the request does not return early.
        let transport = transport.clone();
        let result = tokio::task::spawn_blocking(move || transport.send(&email)).await;

        match result {
            Ok(Ok(_)) => info!("Booking confirmation sent to {}", to_email),
            Ok(Err(e)) => error!("Booking confirmation to {} failed: {}", to_email, e),
            Err(e) => error!("spawn_blocking join error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_credentials_disable_mail() {
        assert!(!Mailer::new(None, None).is_enabled());
        assert!(!Mailer::new(Some("a@b.com".into()), None).is_enabled());
    }

    #[test]
    fn invalid_username_disables_mail() {
        assert!(!Mailer::new(Some("not an address".into()), Some("pw".into())).is_enabled());
    }

    #[tokio::test]
    async fn disabled_mailer_send_is_a_noop() {
        let mailer = Mailer::new(None, None);
        mailer
            .send_booking_confirmation("Asha", "asha@example.com", "Dr. Priya Sharma", "2024-05-01", "10:00")
            .await;
    }
}
