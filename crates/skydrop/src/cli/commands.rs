//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::model::{CardDetails, PaymentMethod, PaymentSelection, PersonDetails, ProofFile};

/// Book command arguments.
///
/// Every detail is optional on the command line so that missing fields are
/// reported by the wizard itself, step by step.
#[derive(Debug, Default, Args)]
pub struct BookCommand {
    /// Sender full name
    #[arg(long, value_name = "NAME")]
    pub sender_name: Option<String>,

    /// Sender phone number
    #[arg(long, value_name = "PHONE")]
    pub sender_phone: Option<String>,

    /// Sender email address
    #[arg(long, value_name = "EMAIL")]
    pub sender_email: Option<String>,

    /// Pickup address
    #[arg(long, value_name = "ADDRESS")]
    pub sender_location: Option<String>,

    /// Sender identity / address proof document
    #[arg(long, value_name = "FILE")]
    pub sender_proof: Option<PathBuf>,

    /// Receiver full name
    #[arg(long, value_name = "NAME")]
    pub receiver_name: Option<String>,

    /// Receiver phone number
    #[arg(long, value_name = "PHONE")]
    pub receiver_phone: Option<String>,

    /// Receiver email address
    #[arg(long, value_name = "EMAIL")]
    pub receiver_email: Option<String>,

    /// Drop-off address
    #[arg(long, value_name = "ADDRESS")]
    pub receiver_location: Option<String>,

    /// Receiver identity / address proof document
    #[arg(long, value_name = "FILE")]
    pub receiver_proof: Option<PathBuf>,

    /// Payment method
    #[arg(short, long, value_enum)]
    pub payment: Option<PaymentMethodArg>,

    /// Card number (card payments only)
    #[arg(long, value_name = "NUMBER")]
    pub card_number: Option<String>,

    /// Card expiry as MM/YY (card payments only)
    #[arg(long, value_name = "MM/YY")]
    pub card_expiry: Option<String>,

    /// Card security code (card payments only, never stored)
    #[arg(long, value_name = "CVV")]
    pub card_cvv: Option<String>,

    /// Return after booking instead of following the delivery
    #[arg(long)]
    pub no_track: bool,
}

impl BookCommand {
    /// Sender details from the flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the proof document cannot be read.
    pub fn sender(&self) -> crate::Result<PersonDetails> {
        person(
            self.sender_name.as_deref(),
            self.sender_phone.as_deref(),
            self.sender_email.as_deref(),
            self.sender_location.as_deref(),
            self.sender_proof.as_ref(),
        )
    }

    /// Receiver details from the flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the proof document cannot be read.
    pub fn receiver(&self) -> crate::Result<PersonDetails> {
        person(
            self.receiver_name.as_deref(),
            self.receiver_phone.as_deref(),
            self.receiver_email.as_deref(),
            self.receiver_location.as_deref(),
            self.receiver_proof.as_ref(),
        )
    }

    /// Payment selection from the flags.
    #[must_use]
    pub fn payment(&self) -> PaymentSelection {
        let method = self.payment.map(PaymentMethod::from);
        let has_card_fields =
            self.card_number.is_some() || self.card_expiry.is_some() || self.card_cvv.is_some();
        let card = (method == Some(PaymentMethod::Card) && has_card_fields).then(|| CardDetails {
            number: self.card_number.clone(),
            expiry: self.card_expiry.clone(),
            cvv: self.card_cvv.clone(),
        });
        PaymentSelection { method, card }
    }
}

fn person(
    name: Option<&str>,
    phone: Option<&str>,
    email: Option<&str>,
    location: Option<&str>,
    proof: Option<&PathBuf>,
) -> crate::Result<PersonDetails> {
    let mut details = PersonDetails {
        full_name: name.unwrap_or_default().to_string(),
        phone: phone.unwrap_or_default().to_string(),
        email: email.unwrap_or_default().to_string(),
        location: location.unwrap_or_default().to_string(),
        ..PersonDetails::default()
    };
    if let Some(path) = proof {
        details.attach_proof(ProofFile::from_path(path)?);
    }
    Ok(details)
}

/// Dashboard command arguments.
#[derive(Debug, Args)]
pub struct DashboardCommand {
    /// Keep sweeping and redrawing until interrupted
    #[arg(short, long)]
    pub watch: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Order log commands.
#[derive(Debug, Subcommand)]
pub enum OrdersCommand {
    /// List the current user's orders
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete the current user's order log
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show order database statistics (operators also see every order log)
    Stats,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Payment method argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PaymentMethodArg {
    /// Credit or debit card
    Card,
    /// PhonePe
    Phonepe,
    /// Google Pay
    Gpay,
    /// Paytm
    Paytm,
}

impl From<PaymentMethodArg> for PaymentMethod {
    fn from(arg: PaymentMethodArg) -> Self {
        match arg {
            PaymentMethodArg::Card => Self::Card,
            PaymentMethodArg::Phonepe => Self::PhonePe,
            PaymentMethodArg::Gpay => Self::GPay,
            PaymentMethodArg::Paytm => Self::Paytm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_arg_conversion() {
        assert_eq!(PaymentMethod::from(PaymentMethodArg::Card), PaymentMethod::Card);
        assert_eq!(
            PaymentMethod::from(PaymentMethodArg::Phonepe),
            PaymentMethod::PhonePe
        );
        assert_eq!(PaymentMethod::from(PaymentMethodArg::Gpay), PaymentMethod::GPay);
        assert_eq!(PaymentMethod::from(PaymentMethodArg::Paytm), PaymentMethod::Paytm);
    }

    #[test]
    fn test_empty_book_command_yields_incomplete_details() {
        let cmd = BookCommand::default();
        let sender = cmd.sender().unwrap();
        assert!(!sender.is_complete());
        assert!(!cmd.payment().is_selected());
    }

    #[test]
    fn test_book_command_with_proof() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"aadhaar").unwrap();

        let cmd = BookCommand {
            sender_name: Some("A".to_string()),
            sender_phone: Some("1".to_string()),
            sender_email: Some("a@example.com".to_string()),
            sender_location: Some("L1".to_string()),
            sender_proof: Some(file.path().to_path_buf()),
            ..BookCommand::default()
        };

        let sender = cmd.sender().unwrap();
        assert!(sender.is_complete());
        assert_eq!(sender.proof_file.unwrap().size_bytes, 7);
    }

    #[test]
    fn test_card_fields_only_for_card_payments() {
        let mut cmd = BookCommand {
            payment: Some(PaymentMethodArg::Gpay),
            card_number: Some("4111111111111111".to_string()),
            ..BookCommand::default()
        };
        assert!(cmd.payment().card.is_none());

        cmd.payment = Some(PaymentMethodArg::Card);
        let payment = cmd.payment();
        assert_eq!(payment.method, Some(PaymentMethod::Card));
        assert!(payment.card.is_some());
    }

    #[test]
    fn test_missing_proof_file() {
        let cmd = BookCommand {
            receiver_proof: Some(PathBuf::from("/nonexistent/proof.pdf")),
            ..BookCommand::default()
        };
        assert!(cmd.receiver().is_err());
    }
}
