use std::sync::Arc;

use tracing::debug;

use super::ProviderFactory;
use crate::error::SqlMapperError;
use crate::types::Dialect;

type Constructor = fn() -> Result<Arc<dyn ProviderFactory>, String>;

/// Dialects with a native driver in this crate. A dialect missing from this
/// table is rejected as unsupported; one whose constructor fails (feature
/// disabled, runtime could not start) is reported as unavailable.
static PROVIDERS: &[(Dialect, Constructor)] = &[
    (Dialect::Sqlite, sqlite_provider as Constructor),
    (Dialect::Postgres, postgres_provider as Constructor),
    (Dialect::Mssql, mssql_provider as Constructor),
];

/// Look up and construct the provider for `dialect`.
///
/// # Errors
///
/// Returns `UnsupportedDialect` when the dialect has no table entry and
/// `ProviderUnavailable` when the provider cannot be constructed.
pub fn resolve(dialect: Dialect) -> Result<Arc<dyn ProviderFactory>, SqlMapperError> {
    let (_, constructor) = PROVIDERS
        .iter()
        .find(|(registered, _)| *registered == dialect)
        .ok_or(SqlMapperError::UnsupportedDialect(dialect))?;
    let provider = constructor()
        .map_err(|reason| SqlMapperError::ProviderUnavailable { dialect, reason })?;
    debug!(%dialect, "resolved provider");
    Ok(provider)
}

/// Every dialect with a table entry, whether or not its feature is compiled in.
pub fn registered_dialects() -> impl Iterator<Item = Dialect> {
    PROVIDERS.iter().map(|(dialect, _)| *dialect)
}

#[cfg(any(
    not(feature = "sqlite"),
    not(feature = "postgres"),
    not(feature = "mssql")
))]
fn feature_disabled(feature: &str) -> String {
    format!("crate was built without the `{feature}` feature")
}

#[cfg(feature = "sqlite")]
fn sqlite_provider() -> Result<Arc<dyn ProviderFactory>, String> {
    Ok(Arc::new(crate::sqlite::SqliteProvider))
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_provider() -> Result<Arc<dyn ProviderFactory>, String> {
    Err(feature_disabled("sqlite"))
}

#[cfg(feature = "postgres")]
fn postgres_provider() -> Result<Arc<dyn ProviderFactory>, String> {
    crate::postgres::PostgresProvider::new()
        .map(|provider| Arc::new(provider) as Arc<dyn ProviderFactory>)
        .map_err(|e| format!("failed to start the tokio runtime: {e}"))
}

#[cfg(not(feature = "postgres"))]
fn postgres_provider() -> Result<Arc<dyn ProviderFactory>, String> {
    Err(feature_disabled("postgres"))
}

#[cfg(feature = "mssql")]
fn mssql_provider() -> Result<Arc<dyn ProviderFactory>, String> {
    crate::mssql::MssqlProvider::new()
        .map(|provider| Arc::new(provider) as Arc<dyn ProviderFactory>)
        .map_err(|e| format!("failed to start the tokio runtime: {e}"))
}

#[cfg(not(feature = "mssql"))]
fn mssql_provider() -> Result<Arc<dyn ProviderFactory>, String> {
    Err(feature_disabled("mssql"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_dialects_are_unsupported() {
        for dialect in [
            Dialect::MySql,
            Dialect::Oracle,
            Dialect::Odbc,
            Dialect::OleDb,
            Dialect::Firebird,
            Dialect::Db2,
            Dialect::Informix,
            Dialect::SqlServerCe,
        ] {
            assert!(
                matches!(resolve(dialect), Err(SqlMapperError::UnsupportedDialect(d)) if d == dialect),
                "{dialect}"
            );
        }
    }

    #[test]
    fn registered_dialects_resolve_to_matching_provider() {
        for dialect in registered_dialects() {
            match resolve(dialect) {
                Ok(provider) => assert_eq!(provider.dialect(), dialect),
                Err(SqlMapperError::ProviderUnavailable { dialect: d, .. }) => assert_eq!(d, dialect),
                Err(other) => panic!("unexpected error for {dialect}: {other}"),
            }
        }
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_is_available_by_default() {
        assert_eq!(resolve(Dialect::Sqlite).unwrap().dialect(), Dialect::Sqlite);
    }

    #[cfg(not(feature = "mssql"))]
    #[test]
    fn disabled_feature_is_unavailable() {
        assert!(matches!(
            resolve(Dialect::Mssql),
            Err(SqlMapperError::ProviderUnavailable { dialect: Dialect::Mssql, .. })
        ));
    }
}
