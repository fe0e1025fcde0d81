//! The booking wizard.
//!
//! Three editable steps (sender, receiver, payment) followed by a
//! submission that waits out a simulated payment delay, stores the booking
//! in the signed-in user's order log and hands it to the tracking view.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{
    BookingId, BookingIdGenerator, BookingRecord, Fare, Notice, PaymentMethod, PaymentSelection,
    PersonDetails,
};
use crate::orders::OrderLog;
use crate::session::SessionProvider;
use crate::tracking::TrackingHandoff;

/// An editable wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WizardStep {
    /// Pickup details.
    Sender,
    /// Drop-off details.
    Receiver,
    /// Payment method and order summary.
    Payment,
}

impl WizardStep {
    /// All steps in order.
    pub const ALL: [Self; 3] = [Self::Sender, Self::Receiver, Self::Payment];

    /// Label shown in the step indicator.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sender => "Sender Details",
            Self::Receiver => "Receiver Details",
            Self::Payment => "Payment",
        }
    }

    /// One-based position of the step.
    #[must_use]
    pub fn number(&self) -> usize {
        match self {
            Self::Sender => 1,
            Self::Receiver => 2,
            Self::Payment => 3,
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Sender => Self::Receiver,
            Self::Receiver | Self::Payment => Self::Payment,
        }
    }

    fn previous(self) -> Self {
        match self {
            Self::Sender | Self::Receiver => Self::Sender,
            Self::Payment => Self::Receiver,
        }
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How a step is drawn in the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepIndicator {
    /// Before the active step.
    Completed,
    /// The active step.
    Active,
    /// After the active step.
    Pending,
}

/// Lifecycle of a wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    /// Editing the given step.
    Editing(WizardStep),
    /// Waiting for the payment delay to elapse.
    Submitting,
    /// The booking was stored.
    Completed(BookingId),
}

/// Everything entered into the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingForm {
    /// Pickup side.
    pub sender: PersonDetails,
    /// Drop-off side.
    pub receiver: PersonDetails,
    /// Payment step.
    pub payment: PaymentSelection,
}

/// Collaborators a wizard submits through.
#[derive(Debug, Clone)]
pub struct BookingContext {
    /// Who is booking.
    pub session: Arc<dyn SessionProvider>,
    /// Where bookings are stored.
    pub orders: Arc<dyn OrderLog>,
    /// Booking id source, shared by every wizard of a process.
    pub ids: Arc<BookingIdGenerator>,
}

impl BookingContext {
    /// Create a context with a fresh id generator.
    #[must_use]
    pub fn new(session: Arc<dyn SessionProvider>, orders: Arc<dyn OrderLog>) -> Self {
        Self {
            session,
            orders,
            ids: Arc::new(BookingIdGenerator::new()),
        }
    }
}

/// The booking wizard state machine.
///
/// Form edits need `&mut self`; step transitions and [`confirm`] only need
/// `&self`, so a confirmation that is still waiting rejects a second one.
///
/// [`confirm`]: BookingWizard::confirm
#[derive(Debug)]
pub struct BookingWizard {
    context: BookingContext,
    processing_delay: Duration,
    form: BookingForm,
    state: Mutex<WizardState>,
}

impl BookingWizard {
    /// Create a wizard at the sender step.
    #[must_use]
    pub fn new(context: BookingContext, processing_delay: Duration) -> Self {
        Self {
            context,
            processing_delay,
            form: BookingForm::default(),
            state: Mutex::new(WizardState::Editing(WizardStep::Sender)),
        }
    }

    /// Current lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn state(&self) -> Result<WizardState> {
        Ok(self.lock_state()?.clone())
    }

    /// The step shown to the user. Submission stays on the payment step.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn step(&self) -> Result<WizardStep> {
        Ok(match &*self.lock_state()? {
            WizardState::Editing(step) => *step,
            WizardState::Submitting | WizardState::Completed(_) => WizardStep::Payment,
        })
    }

    /// Check if a confirmation is waiting for the payment delay.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        matches!(self.state(), Ok(WizardState::Submitting))
    }

    /// Indicator state of each step, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn step_indicators(&self) -> Result<Vec<(WizardStep, StepIndicator)>> {
        let current = self.step()?;
        Ok(WizardStep::ALL
            .iter()
            .map(|&step| {
                let indicator = match step.cmp(&current) {
                    std::cmp::Ordering::Less => StepIndicator::Completed,
                    std::cmp::Ordering::Equal => StepIndicator::Active,
                    std::cmp::Ordering::Greater => StepIndicator::Pending,
                };
                (step, indicator)
            })
            .collect())
    }

    /// The entered data.
    #[must_use]
    pub fn form(&self) -> &BookingForm {
        &self.form
    }

    /// Edit the sender details.
    pub fn sender_mut(&mut self) -> &mut PersonDetails {
        &mut self.form.sender
    }

    /// Edit the receiver details.
    pub fn receiver_mut(&mut self) -> &mut PersonDetails {
        &mut self.form.receiver
    }

    /// Edit the payment selection.
    pub fn payment_mut(&mut self) -> &mut PaymentSelection {
        &mut self.form.payment
    }

    /// Choose a payment method.
    pub fn select_payment(&mut self, method: PaymentMethod) {
        self.form.payment.method = Some(method);
    }

    /// Fare shown on the payment step.
    #[must_use]
    pub fn fare(&self) -> Fare {
        Fare::STANDARD
    }

    /// Label of the confirm button.
    #[must_use]
    pub fn confirm_label(&self) -> String {
        format!("Confirm & Pay ₹{}", self.fare().total())
    }

    /// Validate the active step and move to the next one.
    ///
    /// On the payment step this only reports the step; submitting is done
    /// by [`confirm`](Self::confirm).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] and stays on the step if required
    /// fields are empty, or a submission error once the wizard is no longer
    /// editable.
    pub fn next(&self) -> Result<WizardStep> {
        let mut state = self.lock_state()?;
        let step = Self::editing_step(&state)?;

        let person = match step {
            WizardStep::Sender => &self.form.sender,
            WizardStep::Receiver => &self.form.receiver,
            WizardStep::Payment => return Ok(step),
        };

        let missing = person.missing_fields();
        if !missing.is_empty() {
            debug!(step = step.label(), ?missing, "Step is incomplete");
            return Err(Error::Validation(Notice::missing_information(
                missing.into_iter().map(String::from).collect(),
            )));
        }

        let next = step.next();
        *state = WizardState::Editing(next);
        Ok(next)
    }

    /// Move to the previous step. No-op on the sender step.
    ///
    /// # Errors
    ///
    /// Returns a submission error once the wizard is no longer editable.
    pub fn back(&self) -> Result<WizardStep> {
        let mut state = self.lock_state()?;
        let previous = Self::editing_step(&state)?.previous();
        *state = WizardState::Editing(previous);
        Ok(previous)
    }

    /// Submit the booking.
    ///
    /// Waits for the processing delay, stores a pending record in the
    /// current user's order log and returns the handoff for the tracking
    /// view. If the returned future is dropped before it completes, or the
    /// order log write fails, the wizard goes back to the payment step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if no payment method is selected or the
    /// details are incomplete, [`Error::SubmissionInProgress`] while another
    /// confirmation is waiting, [`Error::AlreadySubmitted`] after success,
    /// or a storage error if the booking cannot be saved.
    pub async fn confirm(&self) -> Result<TrackingHandoff> {
        let guard = self.begin_submit()?;

        tokio::time::sleep(self.processing_delay).await;

        let user = self.context.session.current_user_or_guest();
        let record = BookingRecord::new(
            self.context.ids.next_id(),
            self.form.sender.redacted(),
            self.form.receiver.redacted(),
            self.form.payment.redacted(),
            Utc::now(),
        );

        if let Err(e) = self
            .context
            .orders
            .append(&user.order_log_key(), record.clone())
        {
            warn!(error = %e, "Failed to store booking");
            return Err(e);
        }

        guard.complete(record.id.clone());
        info!(booking_id = %record.id, user = %user.id, "Booking confirmed");
        Ok(TrackingHandoff::new(record))
    }

    fn begin_submit(&self) -> Result<SubmitGuard<'_>> {
        let mut state = self.lock_state()?;
        match Self::editing_step(&state)? {
            WizardStep::Payment => {}
            step => {
                return Err(Error::NotOnPaymentStep { step: step.label() });
            }
        }

        if !self.form.payment.is_selected() {
            return Err(Error::Validation(Notice::select_payment_method()));
        }

        let mut missing: Vec<String> = Vec::new();
        for (side, person) in [("sender", &self.form.sender), ("receiver", &self.form.receiver)] {
            missing.extend(
                person
                    .missing_fields()
                    .into_iter()
                    .map(|field| format!("{side} {field}")),
            );
        }
        if !missing.is_empty() {
            return Err(Error::Validation(Notice::missing_information(missing)));
        }

        *state = WizardState::Submitting;
        debug!(delay_ms = self.processing_delay.as_millis(), "Processing payment");
        Ok(SubmitGuard {
            state: &self.state,
            completed: false,
        })
    }

    fn editing_step(state: &WizardState) -> Result<WizardStep> {
        match state {
            WizardState::Editing(step) => Ok(*step),
            WizardState::Submitting => Err(Error::SubmissionInProgress),
            WizardState::Completed(id) => Err(Error::AlreadySubmitted {
                booking_id: id.to_string(),
            }),
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, WizardState>> {
        self.state
            .lock()
            .map_err(|_| Error::internal("wizard state lock poisoned"))
    }
}

/// Restores the payment step unless the submission completed.
struct SubmitGuard<'a> {
    state: &'a Mutex<WizardState>,
    completed: bool,
}

impl SubmitGuard<'_> {
    fn complete(mut self, id: BookingId) {
        self.set(WizardState::Completed(id));
        self.completed = true;
    }

    // The state is a plain value, so a poisoned lock still holds a usable one.
    fn set(&self, next: WizardState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = next;
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        debug!("Submission abandoned, back to payment");
        self.set(WizardState::Editing(WizardStep::Payment));
    }
}
