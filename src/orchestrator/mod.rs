//! Decryption orchestrator
//!
//! The core state machine of the client. It owns the handle store, the clear
//! value cache and the signature cache, and drives every logical query
//! through `Idle → Fetching → Handled → Decrypting → Decrypted | Failed`.
//!
//! Two rules hold for every request:
//!
//! - **Single flight.** One fetch and one decryption at a time; a request
//!   arriving while its lane is busy is a no-op, not a queued call.
//! - **Staleness guard.** A request captures the session identity when it
//!   starts. If the identity changed by the time a result arrives, the result
//!   is dropped and every phase goes back to what it was.
//!
//! Cached state belongs to the identity that filled it. Snapshots taken under
//! another identity show nothing, and the first commit under a new identity
//! starts from empty caches.
//!
//! Network-boundary failures never surface as `Err`: they become an outcome
//! value plus the status message. `Err` means a local fault.

pub mod context;
pub mod lane;
pub mod snapshot;
pub mod status;

pub use context::{RequestContext, SessionContext, SessionIdentity};
pub use lane::{FlightLane, FlightPermit, LaneState};
pub use snapshot::LedgerSnapshot;
pub use status::{
    DecryptOutcome, FetchOutcome, QueryPhase, StatusLevel, StatusMessage, SubmitOutcome,
};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::{BillsError, BillsResult};
use crate::fhe::{DecryptRequest, DecryptionService};
use crate::handles::{ClearValueCache, HandleStore};
use crate::ledger::LedgerFacade;
use crate::models::{
    ClearScalar, ClearValue, EncryptedHandle, LogicalQuery, MonthKey, RecordEntry, RecordMeta,
    RecordSide,
};
use crate::reports::Breakdown;
use crate::signature::SignatureCache;

type SavedPhases = Vec<(LogicalQuery, Option<QueryPhase>)>;

/// Message of a network-boundary error without the variant prefix
pub(crate) fn boundary_message(err: &BillsError) -> String {
    match err {
        BillsError::Call(message)
        | BillsError::Authorization(message)
        | BillsError::Encryption(message) => message.clone(),
        other => other.to_string(),
    }
}

fn poisoned(what: &str, err: impl std::fmt::Display) -> BillsError {
    BillsError::Storage(format!("{} lock poisoned: {}", what, err))
}

pub struct DecryptionOrchestrator {
    session: SessionContext,
    facade: LedgerFacade,
    service: Arc<dyn DecryptionService>,
    signatures: SignatureCache,
    handles: HandleStore,
    clears: ClearValueCache,
    decrypt_lane: FlightLane,
    phases: Mutex<HashMap<LogicalQuery, QueryPhase>>,
    records: RwLock<Vec<RecordMeta>>,
    status: Mutex<Option<StatusMessage>>,
    /// Identity the cached state was fetched under
    owner: Mutex<Option<SessionIdentity>>,
}

impl DecryptionOrchestrator {
    pub fn new(
        session: SessionContext,
        facade: LedgerFacade,
        service: Arc<dyn DecryptionService>,
        signatures: SignatureCache,
    ) -> Self {
        Self::with_caches(
            session,
            facade,
            service,
            signatures,
            HandleStore::new(),
            ClearValueCache::new(),
        )
    }

    /// Build around existing caches
    pub fn with_caches(
        session: SessionContext,
        facade: LedgerFacade,
        service: Arc<dyn DecryptionService>,
        signatures: SignatureCache,
        handles: HandleStore,
        clears: ClearValueCache,
    ) -> Self {
        Self {
            session,
            facade,
            service,
            signatures,
            handles,
            clears,
            decrypt_lane: FlightLane::new("decrypt"),
            phases: Mutex::new(HashMap::new()),
            records: RwLock::new(Vec::new()),
            status: Mutex::new(None),
            owner: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub(crate) fn facade(&self) -> &LedgerFacade {
        &self.facade
    }

    fn phases(&self) -> BillsResult<MutexGuard<'_, HashMap<LogicalQuery, QueryPhase>>> {
        self.phases.lock().map_err(|e| poisoned("Phase table", e))
    }

    fn owner(&self) -> BillsResult<MutexGuard<'_, Option<SessionIdentity>>> {
        self.owner.lock().map_err(|e| poisoned("Cache owner", e))
    }

    /// The last user-facing message
    pub fn status(&self) -> BillsResult<Option<StatusMessage>> {
        Ok(self
            .status
            .lock()
            .map_err(|e| poisoned("Status", e))?
            .clone())
    }

    pub(crate) fn set_status(&self, message: StatusMessage) -> BillsResult<()> {
        match message.level {
            StatusLevel::Info => debug!(status = %message.text),
            StatusLevel::Advisory => warn!(status = %message.text),
            StatusLevel::Error => warn!(error = %message.text),
        }
        *self.status.lock().map_err(|e| poisoned("Status", e))? = Some(message);
        Ok(())
    }

    pub fn is_deployed(&self) -> BillsResult<bool> {
        Ok(self.session.current()?.is_deployed())
    }

    pub fn is_fetching(&self) -> bool {
        self.handles.fetch_lane().is_in_flight()
    }

    /// The lane shared by handle retrieval and record submission
    pub(crate) fn fetch_lane(&self) -> &FlightLane {
        self.handles.fetch_lane()
    }

    pub fn is_decrypting(&self) -> bool {
        self.decrypt_lane.is_in_flight()
    }

    /// Deployed, signer present, no fetch in flight
    pub fn can_query(&self) -> BillsResult<bool> {
        let identity = self.session.current()?;
        Ok(identity.is_deployed() && identity.signer.is_some() && !self.is_fetching())
    }

    /// `can_query` and no decryption in flight
    pub fn can_decrypt(&self) -> BillsResult<bool> {
        Ok(self.can_query()? && !self.is_decrypting())
    }

    /// Whether a submission could start as far as the orchestrator is concerned
    pub fn can_add(&self) -> BillsResult<bool> {
        self.can_query()
    }

    /// Capture a request token, reporting why not if none can be made
    pub(crate) fn capture(&self) -> BillsResult<Option<RequestContext>> {
        if let Some(request) = self.session.capture()? {
            return Ok(Some(request));
        }
        let identity = self.session.current()?;
        let message = if !identity.is_deployed() {
            format!("{}.", BillsError::not_deployed(identity.chain_id))
        } else {
            "No signer selected. Run `bills account use <address>` first.".to_string()
        };
        self.set_status(StatusMessage::advisory(message))?;
        Ok(None)
    }

    fn owns(&self, identity: &SessionIdentity) -> BillsResult<bool> {
        Ok(self.owner()?.as_ref() == Some(identity))
    }

    /// Make `identity` the owner of the caches, resetting them if it was not
    fn adopt(&self, identity: SessionIdentity) -> BillsResult<()> {
        let mut owner = self.owner()?;
        if owner.as_ref() != Some(&identity) {
            if owner.is_some() {
                info!("session identity changed, resetting cached handles and values");
            }
            self.handles.clear()?;
            self.clears.clear()?;
            self.phases()?.clear();
            self.records
                .write()
                .map_err(|e| poisoned("Record list", e))?
                .clear();
            *owner = Some(identity);
        }
        Ok(())
    }

    fn mark(&self, queries: &[LogicalQuery], phase: QueryPhase) -> BillsResult<SavedPhases> {
        let mut phases = self.phases()?;
        Ok(queries
            .iter()
            .map(|query| {
                let previous = phases.insert(query.clone(), phase);
                (query.clone(), previous)
            })
            .collect())
    }

    fn restore(&self, saved: SavedPhases) -> BillsResult<()> {
        let mut phases = self.phases()?;
        // Reverse so a query listed twice ends on its earlier phase
        for (query, previous) in saved.into_iter().rev() {
            match previous {
                Some(phase) => phases.insert(query, phase),
                None => phases.remove(&query),
            };
        }
        Ok(())
    }

    /// Derive phases from the caches after a commit
    fn settle(&self, queries: &[LogicalQuery]) -> BillsResult<()> {
        let mut settled = Vec::with_capacity(queries.len());
        for query in queries {
            let phase = match self.handles.get(query)? {
                None => QueryPhase::Idle,
                Some(handle) if self.clears.get_fresh(query, Some(&handle))?.is_some() => {
                    QueryPhase::Decrypted
                }
                Some(_) => QueryPhase::Handled,
            };
            settled.push((query.clone(), phase));
        }
        self.phases()?.extend(settled);
        Ok(())
    }

    /// Fetch the current handles of `queries` in one batch
    ///
    /// Zero handles resolve to a clear zero immediately.
    pub async fn refresh(&self, queries: &[LogicalQuery]) -> BillsResult<FetchOutcome> {
        self.run_fetch(queries, false).await
    }

    /// Fetch record metadata and every record's amount handle
    pub async fn refresh_records(&self) -> BillsResult<FetchOutcome> {
        self.run_fetch(&[], true).await
    }

    /// Fetch `queries` for a caller already holding the fetch lane
    pub(crate) async fn refresh_held(
        &self,
        permit: &FlightPermit<'_>,
        request: RequestContext,
        queries: &[LogicalQuery],
    ) -> BillsResult<FetchOutcome> {
        debug_assert_eq!(permit.request(), request.id);
        let span = info_span!("fetch", request = %request.id, chain_id = request.chain_id);
        self.fetch_locked(request, queries, false)
            .instrument(span)
            .await
    }

    async fn run_fetch(
        &self,
        queries: &[LogicalQuery],
        with_records: bool,
    ) -> BillsResult<FetchOutcome> {
        let Some(request) = self.capture()? else {
            return Ok(FetchOutcome::Unavailable);
        };
        let Some(_permit) = self.handles.fetch_lane().try_acquire(request.id) else {
            return Ok(FetchOutcome::Busy);
        };

        let span = info_span!("fetch", request = %request.id, chain_id = request.chain_id);
        self.fetch_locked(request, queries, with_records)
            .instrument(span)
            .await
    }

    async fn fetch_locked(
        &self,
        request: RequestContext,
        queries: &[LogicalQuery],
        with_records: bool,
    ) -> BillsResult<FetchOutcome> {
        let saved = self.mark(queries, QueryPhase::Fetching)?;
        let ctx = request.call_context();

        let result = async {
            let mut all_queries = queries.to_vec();
            let mut advisories = Vec::new();
            let mut records = None;

            if with_records {
                let metas = self.facade.record_metas(ctx).await?;
                advisories.extend(metas.advisories);
                all_queries.extend(
                    (0..metas.value.len() as u64).map(|index| LogicalQuery::RecordAmount { index }),
                );
                records = Some(metas.value);
            }

            let fetched = self.facade.fetch_handles_batch(ctx, &all_queries).await?;
            advisories.extend(fetched.advisories);
            Ok::<_, BillsError>((all_queries, fetched.value, records, advisories))
        }
        .await;

        if !request.is_current(&self.session)? {
            self.restore(saved)?;
            info!("session changed while fetching, result ignored");
            return Ok(FetchOutcome::Stale);
        }

        let (all_queries, handles, records, advisories) = match result {
            Ok(fetched) => fetched,
            Err(err) => {
                self.restore(saved)?;
                let message = boundary_message(&err);
                self.set_status(StatusMessage::error(message.clone()))?;
                return Ok(FetchOutcome::Failed(message));
            }
        };

        self.adopt(request.identity())?;
        let zeros: Vec<(LogicalQuery, ClearValue)> = all_queries
            .iter()
            .zip(&handles)
            .filter(|(_, handle)| handle.is_zero())
            .map(|(query, _)| (query.clone(), ClearValue::zero()))
            .collect();
        self.handles
            .commit(all_queries.iter().cloned().zip(handles.iter().copied()))?;
        self.clears.commit(zeros)?;
        if let Some(records) = records {
            *self
                .records
                .write()
                .map_err(|e| poisoned("Record list", e))? = records;
        }
        self.settle(&all_queries)?;

        info!(count = all_queries.len(), "handles refreshed");
        let status = if advisories.is_empty() {
            StatusMessage::info(format!("Refreshed {} handle(s)", all_queries.len()))
        } else {
            StatusMessage::advisory(advisories.join("\n"))
        };
        self.set_status(status)?;

        Ok(FetchOutcome::Fetched {
            count: all_queries.len(),
            advisories,
        })
    }

    /// Decrypt the current handles of `queries` in one batch
    ///
    /// Zero handles resolve locally; the remaining distinct handles go to the
    /// decryption service in a single call.
    pub async fn decrypt(&self, queries: &[LogicalQuery]) -> BillsResult<DecryptOutcome> {
        if self.is_fetching() {
            debug!("fetch in flight, decryption rejected");
            return Ok(DecryptOutcome::Busy);
        }
        let Some(request) = self.capture()? else {
            return Ok(DecryptOutcome::Unavailable);
        };
        let Some(_permit) = self.decrypt_lane.try_acquire(request.id) else {
            return Ok(DecryptOutcome::Busy);
        };

        let mut items: Vec<(LogicalQuery, EncryptedHandle)> = Vec::new();
        if self.owns(&request.identity())? {
            for query in queries {
                if items.iter().any(|(q, _)| q == query) {
                    continue;
                }
                if let Some(handle) = self.handles.get(query)? {
                    items.push((query.clone(), handle));
                }
            }
        }
        if items.is_empty() {
            self.set_status(StatusMessage::info("Nothing to decrypt. Refresh first."))?;
            return Ok(DecryptOutcome::NoHandles);
        }

        let span = info_span!("decrypt", request = %request.id, chain_id = request.chain_id);
        self.decrypt_locked(request, items).instrument(span).await
    }

    async fn decrypt_locked(
        &self,
        request: RequestContext,
        items: Vec<(LogicalQuery, EncryptedHandle)>,
    ) -> BillsResult<DecryptOutcome> {
        let queries: Vec<LogicalQuery> = items.iter().map(|(query, _)| query.clone()).collect();
        let saved = self.mark(&queries, QueryPhase::Decrypting)?;

        let mut distinct: Vec<EncryptedHandle> = Vec::new();
        for (_, handle) in &items {
            if !handle.is_zero() && !distinct.contains(handle) {
                distinct.push(*handle);
            }
        }

        let mut results: HashMap<EncryptedHandle, ClearScalar> = HashMap::new();
        if !distinct.is_empty() {
            self.set_status(StatusMessage::info("Start decrypt"))?;

            let signature = self
                .signatures
                .get_or_create(&[request.contract], request.signer, self.service.as_ref())
                .await;
            if !request.is_current(&self.session)? {
                self.restore(saved)?;
                info!("session changed while building signature, decryption ignored");
                return Ok(DecryptOutcome::Stale);
            }
            let signature = match signature {
                Ok(signature) => signature,
                Err(err) => {
                    let message = format!(
                        "Unable to build decryption signature: {}",
                        boundary_message(&err)
                    );
                    return self.fail_decrypt(&queries, message);
                }
            };

            let requests: Vec<DecryptRequest> = distinct
                .iter()
                .map(|handle| DecryptRequest {
                    handle: *handle,
                    contract: request.contract,
                })
                .collect();
            debug!(handles = requests.len(), "calling decryption service");
            let decrypted = self.service.user_decrypt(&requests, &signature).await;
            if !request.is_current(&self.session)? {
                self.restore(saved)?;
                info!("session changed while decrypting, result ignored");
                return Ok(DecryptOutcome::Stale);
            }

            results = match decrypted {
                Ok(results) => results,
                Err(err) => {
                    let message = format!("Decryption failed: {}", boundary_message(&err));
                    return self.fail_decrypt(&queries, message);
                }
            };
            if let Some(missing) = distinct.iter().find(|handle| !results.contains_key(handle)) {
                let message = format!("Decryption failed: no result for handle {}", missing.short());
                return self.fail_decrypt(&queries, message);
            }
        }

        let values: Vec<(LogicalQuery, ClearValue)> = items
            .iter()
            .map(|(query, handle)| {
                let value = if handle.is_zero() {
                    ClearScalar::zero()
                } else {
                    results.get(handle).copied().unwrap_or_else(ClearScalar::zero)
                };
                (query.clone(), ClearValue::new(*handle, value))
            })
            .collect();

        self.clears.commit(values)?;
        self.settle(&queries)?;

        info!(count = items.len(), service_handles = distinct.len(), "decryption committed");
        self.set_status(StatusMessage::info("Decrypt completed"))?;
        Ok(DecryptOutcome::Decrypted { count: items.len() })
    }

    fn fail_decrypt(
        &self,
        queries: &[LogicalQuery],
        message: String,
    ) -> BillsResult<DecryptOutcome> {
        self.mark(queries, QueryPhase::Failed)?;
        self.set_status(StatusMessage::error(message.clone()))?;
        Ok(DecryptOutcome::Failed(message))
    }

    /// Fetch and decrypt every tag of `side` for `month`, then aggregate
    pub async fn compute_breakdown(
        &self,
        side: RecordSide,
        month: MonthKey,
    ) -> BillsResult<Breakdown> {
        let queries = LogicalQuery::all_tags(side, month);
        if let FetchOutcome::Fetched { advisories, .. } = self.refresh(&queries).await? {
            let decrypted = self.decrypt(&queries).await?;
            if matches!(decrypted, DecryptOutcome::Decrypted { .. }) && advisories.is_empty() {
                self.set_status(StatusMessage::info(format!(
                    "{} tag breakdown computed",
                    side
                )))?;
            }
        }
        let snapshot = self.snapshot()?;
        Ok(Breakdown::compute(side, month, &side.tags(), &snapshot))
    }

    /// Refresh the caller's records and optionally decrypt their amounts
    pub async fn list_records(&self, decrypt: bool) -> BillsResult<Vec<RecordEntry>> {
        if matches!(self.refresh_records().await?, FetchOutcome::Fetched { .. }) && decrypt {
            let queries: Vec<LogicalQuery> = self
                .snapshot()?
                .records
                .iter()
                .enumerate()
                .map(|(index, _)| LogicalQuery::RecordAmount {
                    index: index as u64,
                })
                .collect();
            if !queries.is_empty() {
                self.decrypt(&queries).await?;
            }
        }
        Ok(self.snapshot()?.record_entries())
    }

    /// Phase of one query
    pub fn phase(&self, query: &LogicalQuery) -> BillsResult<QueryPhase> {
        Ok(self.snapshot()?.phase(query))
    }

    /// Consistent view for presentation
    pub fn snapshot(&self) -> BillsResult<LedgerSnapshot> {
        let identity = self.session.current()?;
        let owned = self.owns(&identity)?;

        let mut snapshot = LedgerSnapshot {
            identity,
            status: self.status()?,
            fetch_in_flight: self.is_fetching(),
            decrypt_in_flight: self.is_decrypting(),
            ..LedgerSnapshot::default()
        };
        if !owned {
            return Ok(snapshot);
        }

        let handles = self.handles.snapshot()?;
        let mut values = BTreeMap::new();
        for (query, handle) in &handles {
            if let Some(value) = self.clears.get_fresh(query, Some(handle))? {
                values.insert(query.clone(), value);
            }
        }
        snapshot.handles = handles;
        snapshot.values = values;
        snapshot.phases = self
            .phases()?
            .iter()
            .map(|(query, phase)| (query.clone(), *phase))
            .collect();
        snapshot.records = self
            .records
            .read()
            .map_err(|e| poisoned("Record list", e))?
            .clone();
        Ok(snapshot)
    }
}
