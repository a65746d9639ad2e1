use crate::{
    error::{
        Error,
        Result,
    },
    ledger::{
        Address,
        ExecutionResult,
        ExecutionStatus,
        SigningProvider,
    },
    moves::MoveChoice,
    round::RoundState,
    transaction::TransactionDescription,
};
use std::time::Duration;
use tracing::{
    info,
    warn,
};

/// Drives one transaction per round through the signing provider and
/// reports a single terminal result. Never resubmits.
pub struct RoundSubmitter<S> {
    signer: S,
    timeout: Duration,
}

impl<S: SigningProvider> RoundSubmitter<S> {
    pub fn new(signer: S, timeout: Duration) -> Self {
        Self { signer, timeout }
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Moves `round` to `Submitting` for `choice` and executes `transaction`.
    /// A round that is not idle is refused untouched and nothing is signed.
    /// Any later failure leaves `round` back at idle.
    pub async fn submit(
        &self,
        round: &mut RoundState,
        choice: MoveChoice,
        sender: &Address,
        transaction: &TransactionDescription,
    ) -> Result<ExecutionResult> {
        *round = round.begin(choice)?;
        match self.execute(sender, transaction).await {
            Ok(result) => Ok(result),
            Err(err) => {
                warn!(?err, %choice, "round rejected");
                *round = round.reject();
                Err(err)
            }
        }
    }

    /// Executes a transaction that has no round attached (faucet, deposit,
    /// mint).
    pub async fn execute(
        &self,
        sender: &Address,
        transaction: &TransactionDescription,
    ) -> Result<ExecutionResult> {
        let result = tokio::time::timeout(
            self.timeout,
            self.signer.sign_and_execute(sender, transaction),
        )
        .await
        .map_err(|_| {
            Error::SubmissionFailed(format!(
                "no confirmation within {}s",
                self.timeout.as_secs()
            ))
        })??;

        if let ExecutionStatus::Failure(reason) = &result.status {
            return Err(Error::SubmissionFailed(format!(
                "transaction {} failed: {reason}",
                result.digest
            )));
        }
        info!(digest = %result.digest, "transaction confirmed");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        round::RoundPhase,
        test_helpers::{
            FakeSigner,
            address,
            game_result_event,
        },
    };

    #[tokio::test]
    async fn submit__returns_round_to_idle_when_signing_is_declined() {
        // given
        let signer = FakeSigner::default();
        signer.push_response(Err(Error::SigningDeclined("user said no".to_string())));
        let submitter = RoundSubmitter::new(signer, Duration::from_secs(1));
        let mut round = RoundState::default();

        // when
        let result = submitter
            .submit(
                &mut round,
                MoveChoice::Rock,
                &address(1),
                &TransactionDescription::new(),
            )
            .await;

        // then
        assert!(matches!(result, Err(Error::SigningDeclined(_))));
        assert_eq!(round, RoundState::default());
    }

    #[tokio::test]
    async fn submit__treats_failed_execution_as_rejection() {
        // given
        let signer = FakeSigner::default();
        signer.push_response(Ok(ExecutionResult {
            digest: "D9".to_string(),
            status: ExecutionStatus::Failure("MoveAbort".to_string()),
            events: vec![],
        }));
        let submitter = RoundSubmitter::new(signer, Duration::from_secs(1));
        let mut round = RoundState::default();

        // when
        let result = submitter
            .submit(
                &mut round,
                MoveChoice::Paper,
                &address(1),
                &TransactionDescription::new(),
            )
            .await;

        // then
        assert!(matches!(result, Err(Error::SubmissionFailed(reason)) if reason.contains("MoveAbort")));
        assert!(round.is_idle());
    }

    #[tokio::test]
    async fn submit__leaves_round_submitting_on_confirmation() {
        // given
        let signer = FakeSigner::default();
        signer.push_success("D1", vec![game_result_event(1, 0)]);
        let submitter = RoundSubmitter::new(signer, Duration::from_secs(1));
        let mut round = RoundState::default();

        // when
        let result = submitter
            .submit(
                &mut round,
                MoveChoice::Rock,
                &address(1),
                &TransactionDescription::new(),
            )
            .await
            .unwrap();

        // then
        assert_eq!(result.digest, "D1");
        assert_eq!(round.phase, RoundPhase::Submitting);
        assert_eq!(submitter.signer().submissions().len(), 1);
    }

    #[tokio::test]
    async fn submit__refuses_a_second_move_while_one_is_pending() {
        // given
        let signer = FakeSigner::default();
        signer.push_success("D2", vec![game_result_event(1, 0)]);
        let submitter = RoundSubmitter::new(signer, Duration::from_secs(1));
        let mut round = RoundState::default().begin(MoveChoice::Rock).unwrap();
        let pending = round;

        // when
        let result = submitter
            .submit(
                &mut round,
                MoveChoice::Paper,
                &address(1),
                &TransactionDescription::new(),
            )
            .await;

        // then
        assert_eq!(result, Err(Error::RoundInProgress));
        assert_eq!(round, pending);
        assert!(submitter.signer().submissions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn execute__times_out_as_submission_failure() {
        // given
        let signer = FakeSigner::default();
        signer.stall();
        let submitter = RoundSubmitter::new(signer, Duration::from_secs(60));

        // when
        let result = submitter
            .execute(&address(1), &TransactionDescription::new())
            .await;

        // then
        assert!(matches!(result, Err(Error::SubmissionFailed(_))));
    }
}
