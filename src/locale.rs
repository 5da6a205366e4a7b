//! User-facing canned text.
//!
//! The product ships Hungarian copy; English is kept for operators and tests
//! that prefer it. Everything a client may render goes through [`Locale`].

use serde::{Deserialize, Serialize};

use crate::model::{CancellationDifficulty, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Hu,
    En,
}

impl Locale {
    pub fn difficulty(self, d: CancellationDifficulty) -> &'static str {
        match (self, d) {
            (Locale::Hu, CancellationDifficulty::Easy) => "egyszerű",
            (Locale::Hu, CancellationDifficulty::Medium) => "közepes nehézségű",
            (Locale::Hu, CancellationDifficulty::Hard) => "nehéz",
            (Locale::En, CancellationDifficulty::Easy) => "easy",
            (Locale::En, CancellationDifficulty::Medium) => "moderately difficult",
            (Locale::En, CancellationDifficulty::Hard) => "hard",
        }
    }

    // ── chat ──────────────────────────────────────────────────────────

    pub fn chat_cancel_intent(self, name: &str, amount: f64, d: CancellationDifficulty) -> String {
        let difficulty = self.difficulty(d);
        match self {
            Locale::Hu => format!(
                "Értem, hogy le szeretnéd mondani a {name} előfizetést (${amount}/hó). Segítek ebben! A lemondás {difficulty} ennél a szolgáltatónál."
            ),
            Locale::En => format!(
                "Got it, you want to cancel {name} (${amount}/month). I can help with that! Cancelling is {difficulty} with this provider."
            ),
        }
    }

    pub fn action_cancel_now(self) -> &'static str {
        match self {
            Locale::Hu => "Lemondás most",
            Locale::En => "Cancel now",
        }
    }

    pub fn action_view_details(self) -> &'static str {
        match self {
            Locale::Hu => "Részletek megtekintése",
            Locale::En => "View details",
        }
    }

    pub fn chat_failure(self) -> &'static str {
        match self {
            Locale::Hu => "Sajnálom, hiba történt a válasz generálása során. Kérlek, próbáld újra később.",
            Locale::En => "Sorry, something went wrong while generating a reply. Please try again later.",
        }
    }

    /// Prompt instruction naming the reply language.
    pub fn reply_language(self) -> &'static str {
        match self {
            Locale::Hu => "Hungarian",
            Locale::En => "English",
        }
    }

    // ── cancellation ──────────────────────────────────────────────────

    pub fn cancel_missing_fields(self) -> &'static str {
        match self {
            Locale::Hu => "Hiányzó adatok: subscriptionId és subscriptionName kötelező",
            Locale::En => "Missing data: subscriptionId and subscriptionName are required",
        }
    }

    pub fn cancel_not_found(self) -> &'static str {
        match self {
            Locale::Hu => "Előfizetés nem található",
            Locale::En => "Subscription not found",
        }
    }

    pub fn cancel_server_error(self) -> &'static str {
        match self {
            Locale::Hu => "Szerver hiba történt a lemondás során",
            Locale::En => "A server error occurred during cancellation",
        }
    }

    pub fn cancel_success(self, name: &str, monthly: f64, annual: f64) -> String {
        match self {
            Locale::Hu => format!(
                "Sikeres lemondás: {name}. Havi megtakarítás: ${monthly}, éves megtakarítás: ${annual}"
            ),
            Locale::En => format!(
                "Cancellation started: {name}. Monthly savings: ${monthly}, annual savings: ${annual}"
            ),
        }
    }

    pub fn steps_online(self, url: &str) -> Vec<String> {
        match self {
            Locale::Hu => vec![
                format!("Látogasd meg: {url}"),
                "Jelentkezz be a fiókodba".into(),
                "Keresd meg a \"Lemondás\" vagy \"Cancel\" gombot".into(),
                "Kövesd a lemondási lépéseket".into(),
            ],
            Locale::En => vec![
                format!("Visit: {url}"),
                "Sign in to your account".into(),
                "Find the \"Cancel\" button".into(),
                "Follow the cancellation steps".into(),
            ],
        }
    }

    pub fn steps_phone(self, phone: &str) -> Vec<String> {
        match self {
            Locale::Hu => vec![
                format!("Hívd a következő számot: {phone}"),
                "Készítsd elő a fiók adataidat".into(),
                "Mondd meg, hogy le szeretnéd mondani az előfizetést".into(),
            ],
            Locale::En => vec![
                format!("Call: {phone}"),
                "Have your account details ready".into(),
                "Tell them you want to cancel the subscription".into(),
            ],
        }
    }

    pub fn retention_warning(self) -> &'static str {
        match self {
            Locale::Hu => "Figyelj a megtartási ajánlatokra - döntsd el előre, hogy elfogadod-e",
            Locale::En => "Watch out for retention offers - decide in advance whether you will accept one",
        }
    }

    pub fn steps_email(self, email: &str) -> Vec<String> {
        match self {
            Locale::Hu => vec![
                format!("Írj emailt a következő címre: {email}"),
                "Tárgy: Előfizetés lemondása".into(),
                "Írd bele a fiók adataidat és a lemondás okát".into(),
                "Várd meg a megerősítő emailt".into(),
            ],
            Locale::En => vec![
                format!("Send an email to: {email}"),
                "Subject: Subscription cancellation".into(),
                "Include your account details and the reason for cancelling".into(),
                "Wait for the confirmation email".into(),
            ],
        }
    }

    pub fn steps_unknown(self) -> Vec<String> {
        match self {
            Locale::Hu => vec!["Lépj kapcsolatba az ügyfélszolgálattal".into()],
            Locale::En => vec!["Contact customer support".into()],
        }
    }

    pub fn confirmation_online(self, name: &str) -> String {
        match self {
            Locale::Hu => format!("Online lemondás elindítva: {name}"),
            Locale::En => format!("Online cancellation started: {name}"),
        }
    }

    pub fn confirmation_phone(self, name: &str) -> String {
        match self {
            Locale::Hu => format!("Telefonos lemondás szükséges: {name}"),
            Locale::En => format!("Cancellation by phone required: {name}"),
        }
    }

    pub fn confirmation_email(self, name: &str) -> String {
        match self {
            Locale::Hu => format!("Email lemondás elindítva: {name}"),
            Locale::En => format!("Email cancellation started: {name}"),
        }
    }

    pub fn confirmation_unknown(self, name: &str) -> String {
        match self {
            Locale::Hu => format!("Lemondás folyamatban: {name}"),
            Locale::En => format!("Cancellation in progress: {name}"),
        }
    }

    // ── generic upstream failures ─────────────────────────────────────

    pub fn analysis_failed(self) -> &'static str {
        match self {
            Locale::Hu => "Nem sikerült elemezni a tranzakciókat",
            Locale::En => "Failed to analyze transactions",
        }
    }

    pub fn projection_failed(self) -> &'static str {
        match self {
            Locale::Hu => "Nem sikerült elkészíteni a pénzforgalmi előrejelzést",
            Locale::En => "Failed to generate cashflow projection",
        }
    }

    pub fn bank_link_failed(self) -> &'static str {
        match self {
            Locale::Hu => "Nem sikerült csatlakoztatni a bankszámlát",
            Locale::En => "Failed to connect bank account",
        }
    }

    pub fn bank_link_succeeded(self) -> &'static str {
        match self {
            Locale::Hu => "Bankszámla sikeresen csatlakoztatva",
            Locale::En => "Bank account connected successfully",
        }
    }

    pub fn storage_failed(self) -> &'static str {
        match self {
            Locale::Hu => "Adatbázis hiba történt",
            Locale::En => "A storage error occurred",
        }
    }

    pub fn unauthorized(self) -> &'static str {
        match self {
            Locale::Hu => "Hitelesítés sikertelen",
            Locale::En => "Authentication failed",
        }
    }

    pub fn link_token_failed(self) -> &'static str {
        match self {
            Locale::Hu => "Nem sikerült létrehozni a csatlakozási tokent",
            Locale::En => "Failed to create link token",
        }
    }

    pub fn public_token_required(self) -> &'static str {
        match self {
            Locale::Hu => "A public_token megadása kötelező",
            Locale::En => "Public token is required",
        }
    }

    pub fn webhook_failed(self) -> &'static str {
        match self {
            Locale::Hu => "A webhook feldolgozása sikertelen",
            Locale::En => "Webhook processing failed",
        }
    }

    pub fn user_not_found(self) -> &'static str {
        match self {
            Locale::Hu => "Felhasználó nem található",
            Locale::En => "User not found",
        }
    }

    // ── request validation ────────────────────────────────────────────

    pub fn message_required(self) -> &'static str {
        match self {
            Locale::Hu => "Az üzenet nem lehet üres",
            Locale::En => "Message must not be empty",
        }
    }

    pub fn no_transactions(self) -> &'static str {
        match self {
            Locale::Hu => "Nincs elemezhető tranzakció",
            Locale::En => "No transactions to analyze",
        }
    }

    pub fn goal_not_found(self) -> &'static str {
        match self {
            Locale::Hu => "Megtakarítási cél nem található",
            Locale::En => "Savings goal not found",
        }
    }

    pub fn notification_not_found(self) -> &'static str {
        match self {
            Locale::Hu => "Értesítés nem található",
            Locale::En => "Notification not found",
        }
    }

    // ── export ────────────────────────────────────────────────────────

    pub fn role_label(self, role: Role) -> &'static str {
        match (self, role) {
            (Locale::Hu, Role::User) => "Felhasználó",
            (Locale::Hu, Role::Assistant) => "AI Asszisztens",
            (Locale::En, Role::User) => "User",
            (Locale::En, Role::Assistant) => "AI Assistant",
        }
    }

    pub fn actions_label(self) -> &'static str {
        match self {
            Locale::Hu => "Műveletek",
            Locale::En => "Actions",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_hungarian() {
        assert_eq!(Locale::default(), Locale::Hu);
    }

    #[test]
    fn parses_lowercase_codes() {
        let l: Locale = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(l, Locale::En);
    }

    #[test]
    fn intent_reply_mentions_name_and_amount() {
        let text = Locale::Hu.chat_cancel_intent("Netflix", 15.99, CancellationDifficulty::Medium);
        assert!(text.contains("Netflix"));
        assert!(text.contains("$15.99/hó"));
        assert!(text.contains("közepes nehézségű"));
    }

    #[test]
    fn phone_steps_carry_number() {
        let steps = Locale::En.steps_phone("+1-800-555-0123");
        assert!(steps[0].contains("+1-800-555-0123"));
    }
}
