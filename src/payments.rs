//! Payments

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Payment identifier.
///
/// The backend assigns integers but routes status reads by string, so the id is kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    /// Wrap an id as the backend spelled it.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id as sent in status paths.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PaymentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for PaymentId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for PaymentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(number) => Self::from(number),
            Raw::Text(text) => Self(text),
        })
    }
}

/// Supported payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Credit card
    CreditCard,
    /// Debit card
    DebitCard,
    /// PayPal
    Paypal,
    /// Bank transfer
    BankTransfer,
    /// Cash on delivery
    CashOnDelivery,
    /// E-wallet
    EWallet,
}

impl PaymentMethod {
    /// Every method, in display order.
    pub const ALL: [Self; 6] = [
        Self::CreditCard,
        Self::DebitCard,
        Self::Paypal,
        Self::BankTransfer,
        Self::CashOnDelivery,
        Self::EWallet,
    ];

    /// Whether card fields must accompany a charge.
    pub const fn requires_card(self) -> bool {
        matches!(self, Self::CreditCard | Self::DebitCard)
    }

    /// Wire name of the method.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::DebitCard => "debit_card",
            Self::Paypal => "paypal",
            Self::BankTransfer => "bank_transfer",
            Self::CashOnDelivery => "cash_on_delivery",
            Self::EWallet => "e_wallet",
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Card fields sent with a card charge.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    /// Card number, spaces allowed
    #[serde(rename = "card_number")]
    pub number: String,

    /// Name on the card
    #[serde(rename = "card_holder")]
    pub holder: String,

    /// Expiry as MM/YY or MM/YYYY
    #[serde(rename = "card_expiry")]
    pub expiry: String,

    /// Card verification code
    #[serde(rename = "card_cvv")]
    pub cvv: String,
}

impl CardDetails {
    /// Card number with everything but the last four digits hidden.
    pub fn masked_number(&self) -> String {
        let digits: Vec<char> = self.number.chars().filter(char::is_ascii_digit).collect();
        let visible = digits.len().saturating_sub(4);

        digits
            .iter()
            .enumerate()
            .map(|(index, digit)| if index < visible { '*' } else { *digit })
            .collect()
    }

    fn normalized_number(&self) -> String {
        self.number.chars().filter(|c| !c.is_whitespace()).collect()
    }
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &self.masked_number())
            .field("holder", &self.holder)
            .field("expiry", &self.expiry)
            .field("cvv", &"***")
            .finish()
    }
}

/// Payment details validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentDetailsError {
    /// Card method without card data
    #[error("{0} requires card details")]
    MissingCard(PaymentMethod),

    /// Card data on a method that takes none
    #[error("{0} does not take card details")]
    UnexpectedCard(PaymentMethod),

    /// Card number is not 12 to 19 digits
    #[error("card number must be 12 to 19 digits")]
    InvalidCardNumber,

    /// Blank card holder
    #[error("card holder is required")]
    MissingHolder,
}

/// Method and card data for a charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDetails {
    /// How the customer pays
    pub method: PaymentMethod,

    /// Card fields, for card methods only
    pub card: Option<CardDetails>,
}

impl PaymentDetails {
    /// Card payment with the given method.
    pub fn card(method: PaymentMethod, card: CardDetails) -> Self {
        Self {
            method,
            card: Some(card),
        }
    }

    /// Payment without card data, e.g. bank transfer.
    pub const fn without_card(method: PaymentMethod) -> Self {
        Self { method, card: None }
    }

    /// Check the details are complete enough to send.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), PaymentDetailsError> {
        match (&self.card, self.method.requires_card()) {
            (None, true) => Err(PaymentDetailsError::MissingCard(self.method)),
            (Some(_), false) => Err(PaymentDetailsError::UnexpectedCard(self.method)),
            (None, false) => Ok(()),
            (Some(card), true) => {
                let number = card.normalized_number();

                if !(12..=19).contains(&number.len()) || !number.chars().all(|c| c.is_ascii_digit())
                {
                    return Err(PaymentDetailsError::InvalidCardNumber);
                }

                if card.holder.trim().is_empty() {
                    return Err(PaymentDetailsError::MissingHolder);
                }

                Ok(())
            }
        }
    }

    /// Details with the card number stripped of whitespace, ready for the wire.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if let Some(card) = self.card.as_mut() {
            card.number = card.normalized_number();
        }

        self
    }
}

/// Client-visible outcome of a payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Not settled yet
    Pending,
    /// Paid
    Succeeded,
    /// Refused, failed or refunded
    Failed,
}

/// Payment status as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    /// `pending`
    Pending,
    /// `processing`
    Processing,
    /// `completed`
    Completed,
    /// `failed`
    Failed,
    /// `refunded`
    Refunded,
    /// Any status this client does not know
    Other(String),
}

impl PaymentStatus {
    /// Wire name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::Other(other) => other,
        }
    }

    /// Collapse a backend status into the three client-visible outcomes.
    ///
    /// A refunded payment no longer pays for the order, so it counts as failed. Unknown statuses
    /// stay pending until a later read says otherwise.
    pub fn outcome(&self) -> PaymentOutcome {
        match self {
            Self::Completed => PaymentOutcome::Succeeded,
            Self::Failed | Self::Refunded => PaymentOutcome::Failed,
            Self::Pending | Self::Processing | Self::Other(_) => PaymentOutcome::Pending,
        }
    }
}

impl From<&str> for PaymentStatus {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "completed" | "succeeded" | "success" => Self::Completed,
            "failed" | "declined" => Self::Failed,
            "refunded" => Self::Refunded,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;

        Ok(Self::from(raw.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    fn visa() -> CardDetails {
        CardDetails {
            number: "4111 1111 1111 1111".to_string(),
            holder: "John Doe".to_string(),
            expiry: "12/2025".to_string(),
            cvv: "123".to_string(),
        }
    }

    #[test]
    fn payment_id_accepts_numbers_and_strings() -> TestResult {
        let from_number: PaymentId = serde_json::from_value(json!(17))?;
        let from_text: PaymentId = serde_json::from_value(json!("pay_17"))?;

        assert_eq!(from_number.as_str(), "17");
        assert_eq!(from_text.as_str(), "pay_17");

        Ok(())
    }

    #[test]
    fn card_methods_require_card_details() {
        let details = PaymentDetails::without_card(PaymentMethod::CreditCard);

        assert_eq!(
            details.validate(),
            Err(PaymentDetailsError::MissingCard(PaymentMethod::CreditCard))
        );
    }

    #[test]
    fn non_card_methods_reject_card_details() {
        let details = PaymentDetails::card(PaymentMethod::Paypal, visa());

        assert_eq!(
            details.validate(),
            Err(PaymentDetailsError::UnexpectedCard(PaymentMethod::Paypal))
        );
    }

    #[test]
    fn card_number_is_validated_after_stripping_spaces() {
        assert_eq!(
            PaymentDetails::card(PaymentMethod::CreditCard, visa()).validate(),
            Ok(())
        );

        let mut card = visa();
        card.number = "4111-1111".to_string();

        assert_eq!(
            PaymentDetails::card(PaymentMethod::DebitCard, card).validate(),
            Err(PaymentDetailsError::InvalidCardNumber)
        );
    }

    #[test]
    fn debug_output_masks_card_secrets() {
        let rendered = format!("{:?}", visa());

        assert!(rendered.contains("************1111"), "got {rendered}");
        assert!(!rendered.contains("123\""), "cvv leaked: {rendered}");
    }

    #[test]
    fn card_fields_use_backend_names() -> TestResult {
        let value = serde_json::to_value(visa())?;

        assert_eq!(value["card_number"], json!("4111 1111 1111 1111"));
        assert_eq!(value["card_cvv"], json!("123"));

        Ok(())
    }

    #[test]
    fn status_outcomes() {
        assert_eq!(
            PaymentStatus::from("completed").outcome(),
            PaymentOutcome::Succeeded
        );
        assert_eq!(
            PaymentStatus::from("failed").outcome(),
            PaymentOutcome::Failed
        );
        assert_eq!(
            PaymentStatus::from("processing").outcome(),
            PaymentOutcome::Pending
        );
        assert_eq!(
            PaymentStatus::from("requires_action").outcome(),
            PaymentOutcome::Pending
        );
    }

    #[test]
    fn method_wire_names_round_trip() -> TestResult {
        for method in PaymentMethod::ALL {
            let value = serde_json::to_value(method)?;

            assert_eq!(value, json!(method.as_str()));
        }

        Ok(())
    }
}
