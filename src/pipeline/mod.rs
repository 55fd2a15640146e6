//! Record submission
//!
//! `MutationPipeline` sends one new record at a time: encrypt the amount for
//! (contract, caller), submit `addRecord`, wait for finality, then refresh
//! every aggregate the record touched in a single fetch. A failure at any
//! step leaves the caches as they were and skips the refresh.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::audit::{AuditEntry, AuditLogger, AuditScope};
use crate::error::BillsResult;
use crate::fhe::{EncryptedInputBuilder, InputEncryptor};
use crate::ledger::AddRecordArgs;
use crate::models::{LogicalQuery, NewRecord, RecordSide, SubmissionId};
use crate::orchestrator::{
    boundary_message, DecryptionOrchestrator, FetchOutcome, FlightLane, FlightPermit,
    RequestContext, StatusMessage, SubmitOutcome,
};

pub struct MutationPipeline {
    orchestrator: Arc<DecryptionOrchestrator>,
    encryptor: Arc<dyn InputEncryptor>,
    audit: Option<AuditLogger>,
    submit_lane: FlightLane,
}

impl MutationPipeline {
    pub fn new(orchestrator: Arc<DecryptionOrchestrator>, encryptor: Arc<dyn InputEncryptor>) -> Self {
        Self {
            orchestrator,
            encryptor,
            audit: None,
            submit_lane: FlightLane::new("submit"),
        }
    }

    /// Record every submission step in `logger`
    pub fn with_audit(mut self, logger: AuditLogger) -> Self {
        self.audit = Some(logger);
        self
    }

    pub fn orchestrator(&self) -> &Arc<DecryptionOrchestrator> {
        &self.orchestrator
    }

    pub fn is_submitting(&self) -> bool {
        self.submit_lane.is_in_flight()
    }

    /// Whether a submission may start now
    pub fn can_add(&self) -> BillsResult<bool> {
        Ok(self.orchestrator.can_add()? && !self.is_submitting())
    }

    /// Aggregates touched by `record`
    ///
    /// Expense tags are always included, so an income record refreshes both
    /// sides' tag handles.
    pub fn cascade_queries(record: &NewRecord) -> Vec<LogicalQuery> {
        let mut queries = vec![
            LogicalQuery::Balance,
            LogicalQuery::MonthlyNet {
                month: record.month,
            },
        ];
        queries.extend(LogicalQuery::all_tags(RecordSide::Expense, record.month));
        if record.side.is_income() {
            queries.extend(LogicalQuery::all_tags(RecordSide::Income, record.month));
        }
        queries
    }

    /// Submit a validated record and refresh what it changed
    ///
    /// The orchestrator's fetch lane is held until the refresh is done, so
    /// no other fetch can run while a submission is pending.
    pub async fn submit(&self, record: NewRecord) -> BillsResult<SubmitOutcome> {
        if self.orchestrator.is_fetching() {
            debug!("fetch in flight, submission rejected");
            return Ok(SubmitOutcome::Busy);
        }
        let Some(request) = self.orchestrator.capture()? else {
            return Ok(SubmitOutcome::Unavailable);
        };
        let Some(_permit) = self.submit_lane.try_acquire(request.id) else {
            return Ok(SubmitOutcome::Busy);
        };
        let Some(fetch_permit) = self.orchestrator.fetch_lane().try_acquire(request.id) else {
            return Ok(SubmitOutcome::Busy);
        };

        let span = info_span!("submit", request = %request.id, chain_id = request.chain_id);
        self.submit_locked(&fetch_permit, request, record)
            .instrument(span)
            .await
    }

    async fn submit_locked(
        &self,
        fetch_permit: &FlightPermit<'_>,
        request: RequestContext,
        record: NewRecord,
    ) -> BillsResult<SubmitOutcome> {
        let submission = SubmissionId::new();
        let scope = AuditScope {
            chain_id: request.chain_id,
            contract: request.contract,
            signer: request.signer,
        };
        let facade = self.orchestrator.facade();

        let input = EncryptedInputBuilder::new(request.contract, request.signer).add64(record.amount);
        let encrypted = match self.encryptor.encrypt(input).await {
            Ok(encrypted) => encrypted,
            Err(err) => {
                let message = format!("Unable to encrypt amount: {}", boundary_message(&err));
                self.audit(AuditEntry::failed(submission, &scope, &record, None, &message));
                return self.fail(message);
            }
        };
        let Some(encrypted_amount) = encrypted.handles.first().copied() else {
            let message = "Unable to encrypt amount: no ciphertext handle returned".to_string();
            self.audit(AuditEntry::failed(submission, &scope, &record, None, &message));
            return self.fail(message);
        };

        let args = AddRecordArgs {
            encrypted_amount,
            input_proof: encrypted.input_proof,
            is_income: record.side.is_income(),
            timestamp: record.timestamp,
            tag: record.tag.to_string(),
            month_key: record.month.value(),
        };
        let tx_hash = match facade.add_record(request.call_context(), args).await {
            Ok(tx_hash) => tx_hash,
            Err(err) => {
                let message = boundary_message(&err);
                self.audit(AuditEntry::failed(submission, &scope, &record, None, &message));
                return self.fail(message);
            }
        };
        self.audit(AuditEntry::submitted(submission, &scope, &record, tx_hash));
        info!(tx = %tx_hash, "record submitted");
        self.orchestrator
            .set_status(StatusMessage::info(format!("Wait for tx:{}...", tx_hash)))?;

        let receipt = match facade.wait_for_receipt(tx_hash).await {
            Ok(receipt) => receipt,
            Err(err) => {
                let message = boundary_message(&err);
                self.audit(AuditEntry::failed(
                    submission,
                    &scope,
                    &record,
                    Some(tx_hash),
                    &message,
                ));
                return self.fail(message);
            }
        };
        self.audit(AuditEntry::confirmed(submission, &scope, &record, tx_hash));
        info!(tx = %tx_hash, block = receipt.block_number, "record confirmed");

        let cascade = self.cascade(fetch_permit, request, &record).await?;
        if matches!(&cascade, FetchOutcome::Fetched { advisories, .. } if advisories.is_empty())
            || cascade == FetchOutcome::Stale
        {
            self.orchestrator
                .set_status(StatusMessage::info("addRecord completed"))?;
        }

        Ok(SubmitOutcome::Confirmed {
            tx_hash,
            receipt,
            cascade,
        })
    }

    async fn cascade(
        &self,
        fetch_permit: &FlightPermit<'_>,
        request: RequestContext,
        record: &NewRecord,
    ) -> BillsResult<FetchOutcome> {
        if !request.is_current(self.orchestrator.session())? {
            info!("session changed while confirming, refresh skipped");
            return Ok(FetchOutcome::Stale);
        }
        self.orchestrator
            .refresh_held(fetch_permit, request, &Self::cascade_queries(record))
            .await
    }

    fn fail(&self, message: String) -> BillsResult<SubmitOutcome> {
        self.orchestrator
            .set_status(StatusMessage::error(message.clone()))?;
        Ok(SubmitOutcome::Failed(message))
    }

    // Audit write failures are logged, never returned
    fn audit(&self, entry: AuditEntry) {
        if let Some(logger) = &self.audit {
            if let Err(err) = logger.log(&entry) {
                warn!(error = %err, operation = %entry.operation, "could not write audit entry");
            }
        }
    }
}
