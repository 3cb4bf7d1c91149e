//! Runtime configuration: store location and the fixed document boilerplate
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_FILE: &str = "config/azza.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub database: DatabaseConfig,
    pub letterhead: Letterhead,
    pub bank: BankBoilerplate,
    pub invoice: InvoiceDefaults,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Company identity printed on every document.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Letterhead {
    pub name_lines: Vec<String>,
    pub address: String,
    pub phone: String,
    pub legal_name: String,
    pub tagline: String,
    pub logo: Option<String>,
    pub statement_title: String,
    pub statement_address: String,
    pub statement_contact: String,
    pub statement_notice: String,
}

/// Rows of the bank table that do not come from the bank account record.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BankBoilerplate {
    pub address: String,
    pub branch: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvoiceDefaults {
    pub payment_terms: String,
    pub validity_days: u32,
    pub signature: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/azza.db".to_string(),
        }
    }
}

impl Default for Letterhead {
    fn default() -> Self {
        Self {
            name_lines: vec![
                "AZZA IS MAKINELERI".to_string(),
                "DERI TEKS. SAN. ve TIC. LTD. STI".to_string(),
            ],
            address: "Adres: SUMER Mah. 27/3 Sokak No:4A Zeytinburnu/IST".to_string(),
            phone: "Cell: +905321696098".to_string(),
            legal_name: "AZZA IS MAKINELERI DERI TEKS. SAN. ve TIC. LTD. STI".to_string(),
            tagline: "Heavy Machinery Import/Export - Zeytinburnu/Istanbul".to_string(),
            logo: Some("/logo.png".to_string()),
            statement_title: "AYLIK HESAP EKSTRESI".to_string(),
            statement_address: "Adres: SUMER Mah. 27/3 Sokak No:4A Zeytinburnu/ISTANBUL".to_string(),
            statement_contact: "Tel: +905321696098 | Vergi Dairesi: Zeytinburnu V.D.".to_string(),
            statement_notice:
                "Bu ekstre elektronik olarak olusturulmustur. Mali musavir onayina tabidir."
                    .to_string(),
        }
    }
}

impl Default for BankBoilerplate {
    fn default() -> Self {
        Self {
            address: "ZEYTINBURNU / ISTANBUL TURKEY".to_string(),
            branch: "39-ZEYTINBURNU BRANCH".to_string(),
        }
    }
}

impl Default for InvoiceDefaults {
    fn default() -> Self {
        Self {
            payment_terms: "30% deposit, 70% before delivery".to_string(),
            validity_days: 30,
            signature: Some("/signature.png".to_string()),
        }
    }
}

impl InvoiceDefaults {
    pub fn validity_notice(&self) -> String {
        format!(
            "This proforma invoice is valid for {} days from the issue date.",
            self.validity_days
        )
    }
}

impl LedgerConfig {
    /// Load from `config/azza.toml` (optional) overlaid with `AZZA__*`
    /// environment variables, e.g. `AZZA__DATABASE__PATH`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_FILE)
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("AZZA")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|err| {
                ConfigError::Message(format!("failed to read configuration from {path}: {err}"))
            })?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = LedgerConfig::load_from("does/not/exist.toml").unwrap();
        assert_eq!(config.invoice.validity_days, 30);
        assert_eq!(config.bank.branch, "39-ZEYTINBURNU BRANCH");
        assert_eq!(config.letterhead.name_lines.len(), 2);
    }

    #[test]
    fn file_overrides_selected_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azza.toml");
        std::fs::write(
            &path,
            "[invoice]\nvalidity_days = 45\n\n[database]\npath = \"/tmp/ledger.db\"\n",
        )
        .unwrap();

        let config = LedgerConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.invoice.validity_days, 45);
        assert_eq!(config.database.path, "/tmp/ledger.db");
        // untouched sections keep their defaults
        assert_eq!(config.invoice.payment_terms, "30% deposit, 70% before delivery");
        assert_eq!(
            config.invoice.validity_notice(),
            "This proforma invoice is valid for 45 days from the issue date."
        );
    }
}
