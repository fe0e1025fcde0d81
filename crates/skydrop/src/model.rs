//! Core booking types for skydrop.
//!
//! This module defines the records a booking is made of, the delivery
//! phases shown while tracking, and booking id generation. Records
//! serialize to the camelCase JSON shape kept in the order log.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::privacy;

/// Prefix of every booking id.
pub const BOOKING_ID_PREFIX: &str = "DRN-";

/// A user-facing notice: a short title and a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Short headline.
    pub title: String,
    /// One-sentence explanation.
    pub description: String,
    /// Fields that caused the notice, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
}

impl Notice {
    /// Create a notice without field details.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            missing_fields: Vec::new(),
        }
    }

    /// Notice for a person step with empty fields.
    #[must_use]
    pub fn missing_information(missing_fields: Vec<String>) -> Self {
        Self {
            missing_fields,
            ..Self::new("Missing Information", "Please fill in all required fields.")
        }
    }

    /// Notice for a payment step without a method.
    #[must_use]
    pub fn select_payment_method() -> Self {
        Self {
            missing_fields: vec!["payment method".to_string()],
            ..Self::new(
                "Select Payment Method",
                "Please select a payment method to continue.",
            )
        }
    }

    /// Notice for a successful booking.
    #[must_use]
    pub fn booking_confirmed() -> Self {
        Self::new(
            "Booking Confirmed!",
            "Your drone delivery has been scheduled.",
        )
    }

    /// Notice for the tracking view opened without a booking.
    #[must_use]
    pub fn no_booking() -> Self {
        Self::new(
            "No Booking Found",
            "Please book a drone delivery to see tracking information.",
        )
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.description)?;
        if !self.missing_fields.is_empty() {
            write!(f, " (missing: {})", self.missing_fields.join(", "))?;
        }
        Ok(())
    }
}

/// Reference to an uploaded identity document.
///
/// Only the file name, size and a BLAKE3 digest are kept; the document
/// itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofFile {
    /// Original file name.
    pub file_name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// BLAKE3 digest of the contents.
    pub digest: String,
}

impl ProofFile {
    /// Build a reference from in-memory contents.
    #[must_use]
    pub fn from_bytes(file_name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            file_name: file_name.into(),
            size_bytes: bytes.len() as u64,
            digest: Self::compute_digest(bytes),
        }
    }

    /// Read a file from disk and build a reference to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::ProofFile {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::from_bytes(file_name, &bytes))
    }

    /// Compute the BLAKE3 digest of the given contents.
    #[must_use]
    pub fn compute_digest(bytes: &[u8]) -> String {
        blake3::hash(bytes).to_hex().to_string()
    }
}

/// Contact and location details of a sender or receiver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDetails {
    /// Full name.
    pub full_name: String,
    /// Phone number.
    pub phone: String,
    /// Email address.
    pub email: String,
    /// Pickup or delivery address.
    pub location: String,
    /// Whether identity / proof of address was confirmed.
    pub identity_proof_present: bool,
    /// Uploaded proof document, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_file: Option<ProofFile>,
}

impl PersonDetails {
    /// Copy with card numbers removed from the free-text fields.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            full_name: privacy::redact_card_numbers(&self.full_name),
            email: privacy::redact_card_numbers(&self.email),
            location: privacy::redact_card_numbers(&self.location),
            ..self.clone()
        }
    }

    /// Attach an identity document, which also confirms proof.
    pub fn attach_proof(&mut self, proof: ProofFile) {
        self.proof_file = Some(proof);
        self.identity_proof_present = true;
    }

    /// Names of the required fields that are still empty.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("full name", &self.full_name),
            ("phone", &self.phone),
            ("email", &self.email),
            ("location", &self.location),
        ] {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        if !self.identity_proof_present {
            missing.push("identity proof");
        }
        missing
    }

    /// Check if every required field is filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Supported payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Credit or debit card.
    Card,
    /// PhonePe wallet.
    PhonePe,
    /// Google Pay.
    GPay,
    /// Paytm wallet.
    Paytm,
}

impl PaymentMethod {
    /// All methods in display order.
    pub const ALL: [Self; 4] = [Self::Card, Self::PhonePe, Self::GPay, Self::Paytm];

    /// Label shown to the user.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Card => "Credit/Debit Card",
            Self::PhonePe => "PhonePe",
            Self::GPay => "Google Pay",
            Self::Paytm => "Paytm",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Card => write!(f, "card"),
            Self::PhonePe => write!(f, "phonepe"),
            Self::GPay => write!(f, "gpay"),
            Self::Paytm => write!(f, "paytm"),
        }
    }
}

/// Card fields collected when paying by card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    /// Card number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    /// Expiry as MM/YY.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    /// Security code. Never serialized.
    #[serde(default, skip_serializing)]
    pub cvv: Option<String>,
}

/// The payment step of a booking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSelection {
    /// Selected method, if any.
    pub method: Option<PaymentMethod>,
    /// Card fields, only meaningful for [`PaymentMethod::Card`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<CardDetails>,
}

impl PaymentSelection {
    /// Select a payment method.
    #[must_use]
    pub fn with_method(method: PaymentMethod) -> Self {
        Self {
            method: Some(method),
            card: None,
        }
    }

    /// Check if a method has been chosen.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.method.is_some()
    }

    /// Copy suitable for persisting: card number masked, no security code,
    /// and no card fields at all for non-card methods.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let card = match self.method {
            Some(PaymentMethod::Card) => self.card.as_ref().map(|card| CardDetails {
                number: card.number.as_deref().map(privacy::mask_card_number),
                expiry: card.expiry.clone(),
                cvv: None,
            }),
            _ => None,
        };
        Self {
            method: self.method,
            card,
        }
    }
}

/// Lifecycle status of a stored booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    /// Booked, not yet picked up.
    Pending,
    /// On its way.
    InTransit,
    /// Handed over to the receiver.
    Delivered,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InTransit => write!(f, "in-transit"),
            Self::Delivered => write!(f, "delivered"),
        }
    }
}

/// Delivery progress stage shown while tracking.
///
/// Phases are ordered; a tracked delivery never moves to a lower phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPhase {
    /// The booking was accepted.
    OrderConfirmed,
    /// A drone left for the pickup.
    Dispatched,
    /// The parcel is in the air.
    InTransit,
    /// The parcel arrived.
    Delivered,
}

impl DeliveryPhase {
    /// All phases in order.
    pub const ALL: [Self; 4] = [
        Self::OrderConfirmed,
        Self::Dispatched,
        Self::InTransit,
        Self::Delivered,
    ];

    /// Label shown on the timeline.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::OrderConfirmed => "Order Confirmed",
            Self::Dispatched => "Drone Dispatched",
            Self::InTransit => "In Transit",
            Self::Delivered => "Delivered",
        }
    }

    /// Check if this is the last phase.
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

impl std::fmt::Display for DeliveryPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifier of a booking, formatted `DRN-<base36 millis>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(String);

impl BookingId {
    /// Build an id from a millisecond timestamp.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self(format!("{BOOKING_ID_PREFIX}{}", to_base36(millis)))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Generates booking ids from the wall clock.
///
/// Ids are strictly increasing per generator: two bookings in the same
/// millisecond get consecutive timestamps instead of the same id.
#[derive(Debug, Default)]
pub struct BookingIdGenerator {
    last_millis: AtomicU64,
}

impl BookingIdGenerator {
    /// Create a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate an id for the current time.
    pub fn next_id(&self) -> BookingId {
        self.next_at(Utc::now())
    }

    /// Generate an id for the given time.
    pub fn next_at(&self, now: DateTime<Utc>) -> BookingId {
        let now_millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let mut last = self.last_millis.load(Ordering::SeqCst);
        loop {
            let candidate = now_millis.max(last + 1);
            match self.last_millis.compare_exchange(
                last,
                candidate,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return BookingId::from_millis(candidate),
                Err(actual) => last = actual,
            }
        }
    }
}

/// Order summary shown on the payment step, in whole rupees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fare {
    /// Delivery fee.
    pub delivery_fee: u32,
    /// Service tax.
    pub service_tax: u32,
}

impl Fare {
    /// The flat fare charged for every delivery.
    pub const STANDARD: Self = Self {
        delivery_fee: 299,
        service_tax: 54,
    };

    /// Total amount payable.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.delivery_fee + self.service_tax
    }
}

/// One requested delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    /// Booking id.
    pub id: BookingId,
    /// Pickup side.
    pub sender: PersonDetails,
    /// Drop-off side.
    pub receiver: PersonDetails,
    /// Payment selection (redacted).
    pub payment: PaymentSelection,
    /// Current status.
    pub status: BookingStatus,
    /// When the booking was submitted.
    pub created_at: DateTime<Utc>,
}

impl BookingRecord {
    /// Create a pending booking.
    #[must_use]
    pub fn new(
        id: BookingId,
        sender: PersonDetails,
        receiver: PersonDetails,
        payment: PaymentSelection,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sender,
            receiver,
            payment,
            status: BookingStatus::Pending,
            created_at,
        }
    }

    /// Time elapsed since the booking was created.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }

    /// Check if the booking has been delivered.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        self.status == BookingStatus::Delivered
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn person(name: &str, location: &str) -> PersonDetails {
        PersonDetails {
            full_name: name.to_string(),
            phone: "+91 98765 43210".to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            location: location.to_string(),
            identity_proof_present: true,
            proof_file: None,
        }
    }

    pub fn record(id: &str, created_at: DateTime<Utc>) -> BookingRecord {
        BookingRecord::new(
            BookingId(id.to_string()),
            person("A", "L1"),
            person("B", "L2"),
            PaymentSelection::with_method(PaymentMethod::GPay),
            created_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_missing_fields_empty_person() {
        let person = PersonDetails::default();
        assert_eq!(
            person.missing_fields(),
            vec!["full name", "phone", "email", "location", "identity proof"]
        );
        assert!(!person.is_complete());
    }

    #[test]
    fn test_whitespace_counts_as_missing() {
        let mut person = fixtures::person("A", "L1");
        person.location = "   ".to_string();
        assert_eq!(person.missing_fields(), vec!["location"]);
    }

    #[test]
    fn test_proof_required() {
        let mut person = fixtures::person("A", "L1");
        person.identity_proof_present = false;
        assert!(!person.is_complete());

        person.attach_proof(ProofFile::from_bytes("id.pdf", b"passport scan"));
        assert!(person.is_complete());
        assert_eq!(person.proof_file.as_ref().unwrap().size_bytes, 13);
    }

    #[test]
    fn test_proof_digest_consistency() {
        let a = ProofFile::from_bytes("a.pdf", b"same");
        let b = ProofFile::from_bytes("b.pdf", b"same");
        assert_eq!(a.digest, b.digest);
        assert_ne!(a.digest, ProofFile::compute_digest(b"different"));
    }

    #[test]
    fn test_proof_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"licence").unwrap();

        let proof = ProofFile::from_path(file.path()).unwrap();
        assert_eq!(proof.size_bytes, 7);
        assert_eq!(proof.digest, ProofFile::compute_digest(b"licence"));
    }

    #[test]
    fn test_proof_from_missing_path() {
        let err = ProofFile::from_path("/nonexistent/id.pdf").unwrap_err();
        assert!(matches!(err, Error::ProofFile { .. }));
    }

    #[test]
    fn test_payment_method_serialization() {
        let json = serde_json::to_string(&PaymentMethod::PhonePe).unwrap();
        assert_eq!(json, "\"phonepe\"");
        let method: PaymentMethod = serde_json::from_str("\"gpay\"").unwrap();
        assert_eq!(method, PaymentMethod::GPay);
        assert_eq!(PaymentMethod::Card.label(), "Credit/Debit Card");
    }

    #[test]
    fn test_redacted_payment_masks_card() {
        let payment = PaymentSelection {
            method: Some(PaymentMethod::Card),
            card: Some(CardDetails {
                number: Some("4111 1111 1111 1234".to_string()),
                expiry: Some("12/29".to_string()),
                cvv: Some("123".to_string()),
            }),
        };
        let redacted = payment.redacted();
        let card = redacted.card.unwrap();
        assert_eq!(card.number.as_deref(), Some("•••• •••• •••• 1234"));
        assert!(card.cvv.is_none());
        assert_eq!(card.expiry.as_deref(), Some("12/29"));
    }

    #[test]
    fn test_redacted_person_strips_card_numbers() {
        let mut person = fixtures::person("A", "Flat 2, 4111 1111 1111 1111 Road");
        person.phone = "+91 98765 43210".to_string();

        let redacted = person.redacted();
        assert_eq!(redacted.location, "Flat 2, [REDACTED] Road");
        assert_eq!(redacted.full_name, "A");
        assert_eq!(redacted.phone, "+91 98765 43210");
        assert!(redacted.is_complete());
    }

    #[test]
    fn test_redacted_payment_drops_card_for_wallets() {
        let payment = PaymentSelection {
            method: Some(PaymentMethod::Paytm),
            card: Some(CardDetails::default()),
        };
        assert!(payment.redacted().card.is_none());
    }

    #[test]
    fn test_cvv_never_serialized() {
        let card = CardDetails {
            number: None,
            expiry: None,
            cvv: Some("999".to_string()),
        };
        let json = serde_json::to_string(&card).unwrap();
        assert!(!json.contains("999"));
    }

    #[test]
    fn test_booking_status_serialization() {
        assert_eq!(
            serde_json::to_string(&BookingStatus::InTransit).unwrap(),
            "\"in-transit\""
        );
        assert_eq!(BookingStatus::Delivered.to_string(), "delivered");
    }

    #[test]
    fn test_phase_ordering() {
        assert!(DeliveryPhase::OrderConfirmed < DeliveryPhase::Dispatched);
        assert!(DeliveryPhase::Dispatched < DeliveryPhase::InTransit);
        assert!(DeliveryPhase::InTransit < DeliveryPhase::Delivered);
        assert!(DeliveryPhase::Delivered.is_final());
        assert_eq!(DeliveryPhase::Dispatched.to_string(), "Drone Dispatched");
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(BookingId::from_millis(1_700_000_000_000).as_str(), "DRN-LOYW3V28");
    }

    #[test]
    fn test_id_generator_distinct_within_same_millisecond() {
        let generator = BookingIdGenerator::new();
        let now = Utc::now();
        let ids: HashSet<BookingId> = (0..100).map(|_| generator.next_at(now)).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_id_generator_format() {
        let id = BookingIdGenerator::new().next_id();
        let suffix = id.as_str().strip_prefix(BOOKING_ID_PREFIX).unwrap();
        assert!(!suffix.is_empty());
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fare_total() {
        assert_eq!(Fare::STANDARD.total(), 353);
    }

    #[test]
    fn test_record_json_shape() {
        let record = fixtures::record("DRN-1", Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "DRN-1");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["sender"]["fullName"], "A");
        assert_eq!(json["sender"]["identityProofPresent"], true);
        assert!(json.get("createdAt").is_some());

        let back: BookingRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_age() {
        let created = Utc::now() - chrono::Duration::seconds(61);
        let record = fixtures::record("DRN-1", created);
        assert!(record.age(Utc::now()) >= chrono::Duration::seconds(61));
        assert!(!record.is_delivered());
    }

    #[test]
    fn test_notice_display() {
        let notice = Notice::missing_information(vec!["phone".to_string()]);
        assert_eq!(
            notice.to_string(),
            "Missing Information: Please fill in all required fields. (missing: phone)"
        );
        assert_eq!(
            Notice::booking_confirmed().to_string(),
            "Booking Confirmed!: Your drone delivery has been scheduled."
        );
    }
}
