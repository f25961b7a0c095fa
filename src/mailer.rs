use async_trait::async_trait;

/// Outbound delivery collaborator for one-time codes. The real deployment
/// plugs an SMTP sender in here; failures propagate to the caller rather
/// than being swallowed.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_code(&self, to: &str, subject: &str, code: &str) -> anyhow::Result<()>;
}

/// Default mailer: logs the code instead of sending it. Useful for local
/// development where no SMTP relay is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_code(&self, to: &str, subject: &str, code: &str) -> anyhow::Result<()> {
        tracing::info!(%to, %subject, %code, "outbound verification code");
        Ok(())
    }
}

/// Records every delivery in memory so tests can read issued codes back.
#[derive(Default)]
pub struct MemoryMailer {
    pub sent: std::sync::Mutex<Vec<SentMail>>,
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub code: String,
}

impl MemoryMailer {
    /// Most recent code sent to `to`, if any.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == to)
            .map(|m| m.code.clone())
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send_code(&self, to: &str, subject: &str, code: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            code: code.to_string(),
        });
        Ok(())
    }
}
