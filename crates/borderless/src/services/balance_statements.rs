use borderless_client::{Dispatcher, Result};
use borderless_common::RequestSpec;
use bytes::Bytes;
use serde_json::Value;

/// Downloadable statement formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFormat {
    /// Printable PDF.
    Pdf,
    /// Comma-separated values.
    Csv,
    /// Excel workbook.
    Xlsx,
}

impl StatementFormat {
    const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    const fn media_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Csv => "text/csv",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

/// Balance statements.
#[derive(Debug, Clone, Copy)]
pub struct BalanceStatementService<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> BalanceStatementService<'a> {
    /// Creates the service over `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Fetches a statement as JSON.
    ///
    /// `query` typically carries `currency`, `intervalStart`, `intervalEnd`
    /// and `type`.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn statement(
        &self,
        profile_id: u64,
        balance_id: u64,
        query: &[(&str, &str)],
    ) -> Result<Value> {
        self.dispatcher
            .get(
                &format!("v1/profiles/{profile_id}/balance-statements/{balance_id}/statement.json"),
                query,
            )
            .await
    }

    /// Downloads a statement file.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn statement_file(
        &self,
        profile_id: u64,
        balance_id: u64,
        format: StatementFormat,
        query: &[(&str, &str)],
    ) -> Result<Bytes> {
        let spec = RequestSpec::get(format!(
            "v1/profiles/{profile_id}/balance-statements/{balance_id}/statement.{}",
            format.extension()
        ))
        .with_query_pairs(query.iter().copied())
        .with_header("Accept", format.media_type());

        self.dispatcher.execute_raw(spec).await
    }
}
