//! Typed access to the ledger contract
//!
//! Turns logical queries into contract calls and classifies failures:
//!
//! - an empty return means the operation is not available at the resolved
//!   address; the zero handle is substituted and an advisory is produced
//! - anything else fails the whole call as `"<op>() failed: <error>"`

use std::sync::Arc;

use tracing::{debug, warn};

use super::contract::{AddRecordArgs, CallContext, CallError, LedgerContract, Receipt};
use crate::error::{BillsError, BillsResult};
use crate::models::{EncryptedHandle, LogicalQuery, RecordMeta, TxHash};

/// A value read from the ledger plus any advisories raised while reading it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched<T> {
    pub value: T,
    pub advisories: Vec<String>,
}

impl<T> Fetched<T> {
    fn clean(value: T) -> Self {
        Self {
            value,
            advisories: Vec::new(),
        }
    }
}

/// Advisory for an operation missing from the deployed contract
pub fn unavailable_advisory(operation: &str) -> String {
    format!(
        "{}() not available on this contract address. Please redeploy the contract.",
        operation
    )
}

fn failed(operation: &str, err: CallError) -> BillsError {
    BillsError::Call(format!("{}() failed: {}", operation, err))
}

/// Read/write access to one ledger contract implementation
#[derive(Clone)]
pub struct LedgerFacade {
    contract: Arc<dyn LedgerContract>,
}

impl LedgerFacade {
    pub fn new(contract: Arc<dyn LedgerContract>) -> Self {
        Self { contract }
    }

    async fn call(&self, ctx: CallContext, query: &LogicalQuery) -> Result<EncryptedHandle, CallError> {
        match query {
            LogicalQuery::Balance => self.contract.get_my_balance(ctx).await,
            LogicalQuery::MonthlyNet { month } => {
                self.contract.get_my_monthly_net(ctx, month.value()).await
            }
            LogicalQuery::ExpenseByTag { month, tag } => {
                self.contract
                    .get_my_monthly_expense_by_tag(ctx, month.value(), tag.as_str())
                    .await
            }
            LogicalQuery::IncomeByTag { month, tag } => {
                self.contract
                    .get_my_monthly_income_by_tag(ctx, month.value(), tag.as_str())
                    .await
            }
            LogicalQuery::RecordAmount { index } => {
                self.contract.get_my_record_amount(ctx, *index).await
            }
        }
    }

    /// Fetch the current handle for one query
    pub async fn fetch_handle(
        &self,
        ctx: CallContext,
        query: &LogicalQuery,
    ) -> BillsResult<Fetched<EncryptedHandle>> {
        let batch = self
            .fetch_handles_batch(ctx, std::slice::from_ref(query))
            .await?;
        Ok(Fetched {
            value: batch.value.first().copied().unwrap_or(EncryptedHandle::ZERO),
            advisories: batch.advisories,
        })
    }

    /// Fetch the current handles for several queries, in query order
    ///
    /// Every query whose operation turns out to be unavailable gets the zero
    /// handle. Any other failure fails the whole batch.
    pub async fn fetch_handles_batch(
        &self,
        ctx: CallContext,
        queries: &[LogicalQuery],
    ) -> BillsResult<Fetched<Vec<EncryptedHandle>>> {
        let mut handles = Vec::with_capacity(queries.len());
        let mut unavailable: Vec<&'static str> = Vec::new();

        for query in queries {
            let operation = query.operation();
            if unavailable.contains(&operation) {
                handles.push(EncryptedHandle::ZERO);
                continue;
            }
            match self.call(ctx, query).await {
                Ok(handle) => handles.push(handle),
                Err(CallError::EmptyReturn) => {
                    warn!(operation, contract = %ctx.contract, "operation not available");
                    unavailable.push(operation);
                    handles.push(EncryptedHandle::ZERO);
                }
                Err(err) => return Err(failed(operation, err)),
            }
        }

        // Earlier queries of an operation that later came back empty
        for (handle, query) in handles.iter_mut().zip(queries) {
            if unavailable.contains(&query.operation()) {
                *handle = EncryptedHandle::ZERO;
            }
        }

        debug!(count = queries.len(), "fetched handles");
        Ok(Fetched {
            value: handles,
            advisories: unavailable.into_iter().map(unavailable_advisory).collect(),
        })
    }

    /// Number of records owned by the caller
    pub async fn record_count(&self, ctx: CallContext) -> BillsResult<Fetched<u64>> {
        match self.contract.get_my_record_count(ctx).await {
            Ok(count) => Ok(Fetched::clean(count)),
            Err(CallError::EmptyReturn) => Ok(Fetched {
                value: 0,
                advisories: vec![unavailable_advisory("getMyRecordCount")],
            }),
            Err(err) => Err(failed("getMyRecordCount", err)),
        }
    }

    /// Clear metadata of every record owned by the caller, in index order
    pub async fn record_metas(&self, ctx: CallContext) -> BillsResult<Fetched<Vec<RecordMeta>>> {
        let count = self.record_count(ctx).await?;
        let mut metas = Vec::new();
        for index in 0..count.value {
            match self.contract.get_my_record_meta(ctx, index).await {
                Ok(meta) => metas.push(meta),
                Err(CallError::EmptyReturn) => {
                    let mut advisories = count.advisories;
                    advisories.push(unavailable_advisory("getMyRecordMeta"));
                    return Ok(Fetched {
                        value: Vec::new(),
                        advisories,
                    });
                }
                Err(err) => return Err(failed("getMyRecordMeta", err)),
            }
        }
        Ok(Fetched {
            value: metas,
            advisories: count.advisories,
        })
    }

    /// Submit `addRecord`
    pub async fn add_record(&self, ctx: CallContext, args: AddRecordArgs) -> BillsResult<TxHash> {
        self.contract
            .add_record(ctx, args)
            .await
            .map_err(|err| failed("addRecord", err))
    }

    /// Wait for a submitted transaction to become final
    ///
    /// A mined-but-reverted transaction is an error.
    pub async fn wait_for_receipt(&self, tx: TxHash) -> BillsResult<Receipt> {
        let receipt = self
            .contract
            .wait_for_receipt(tx)
            .await
            .map_err(|err| failed("addRecord", err))?;
        if !receipt.success {
            return Err(BillsError::Call(format!(
                "addRecord() failed: transaction {} reverted",
                tx.short()
            )));
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, MonthKey, RecordSide};
    use crate::testing::FakeLedger;

    fn ctx(ledger: &FakeLedger) -> CallContext {
        CallContext {
            contract: ledger.address(),
            from: Address::from_bytes([9; 20]),
        }
    }

    #[tokio::test]
    async fn test_batch_preserves_query_order() {
        let ledger = FakeLedger::new();
        let month = MonthKey::new(202401).unwrap();
        let queries = vec![LogicalQuery::Balance, LogicalQuery::MonthlyNet { month }];
        ledger.set_handle(&queries[0], EncryptedHandle::from_bytes([1; 32]));
        ledger.set_handle(&queries[1], EncryptedHandle::from_bytes([2; 32]));

        let facade = LedgerFacade::new(ledger.clone().into_contract());
        let fetched = facade.fetch_handles_batch(ctx(&ledger), &queries).await.unwrap();

        assert_eq!(
            fetched.value,
            vec![
                EncryptedHandle::from_bytes([1; 32]),
                EncryptedHandle::from_bytes([2; 32])
            ]
        );
        assert!(fetched.advisories.is_empty());
    }

    #[tokio::test]
    async fn test_empty_return_substitutes_zero_with_advisory() {
        let ledger = FakeLedger::new();
        let month = MonthKey::new(202401).unwrap();
        ledger.set_handle(&LogicalQuery::Balance, EncryptedHandle::from_bytes([1; 32]));
        ledger.make_unavailable("getMyMonthlyExpenseByTag");

        let mut queries = vec![LogicalQuery::Balance];
        queries.extend(LogicalQuery::all_tags(RecordSide::Expense, month));

        let facade = LedgerFacade::new(ledger.clone().into_contract());
        let fetched = facade.fetch_handles_batch(ctx(&ledger), &queries).await.unwrap();

        assert_eq!(fetched.value[0], EncryptedHandle::from_bytes([1; 32]));
        assert!(fetched.value[1..].iter().all(EncryptedHandle::is_zero));
        assert_eq!(
            fetched.advisories,
            vec!["getMyMonthlyExpenseByTag() not available on this contract address. Please redeploy the contract."]
        );
    }

    #[tokio::test]
    async fn test_other_failure_fails_batch() {
        let ledger = FakeLedger::new();
        ledger.fail_with(CallError::Transport("connection refused".into()));

        let facade = LedgerFacade::new(ledger.clone().into_contract());
        let err = facade
            .fetch_handle(ctx(&ledger), &LogicalQuery::Balance)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Call failed: getMyBalance() failed: connection refused"
        );
    }

    #[tokio::test]
    async fn test_reverted_receipt_is_error() {
        let ledger = FakeLedger::new();
        ledger.revert_next_receipt();

        let facade = LedgerFacade::new(ledger.clone().into_contract());
        let err = facade
            .wait_for_receipt(TxHash::from_bytes([3; 32]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("reverted"));
    }
}
