//! The fixed SQL statements behind each endpoint.

use strum::{Display, EnumIter};

/// Connectivity check run once at startup.
pub const PING: &str = "SELECT 1";

pub const LIST_PATIENTS: &str =
    "SELECT patient_id, first_name, last_name, date_of_birth FROM patients";

pub const LIST_PROVIDERS: &str =
    "SELECT first_name, last_name, provider_speciality FROM providers";

/// First-name search without a bound parameter.
pub const SEARCH_PATIENTS: &str =
    "SELECT patient_id, first_name FROM patients WHERE first_name IS NOT NULL";

/// First-name search with the name bound as `?`.
pub const SEARCH_PATIENTS_BY_FIRST_NAME: &str =
    "SELECT patient_id, first_name FROM patients WHERE first_name IS NOT NULL AND first_name = ?";

/// Specialty search without a bound parameter.
pub const SEARCH_PROVIDERS: &str =
    "SELECT provider_id, provider_speciality FROM providers WHERE provider_speciality IS NOT NULL";

/// Specialty search with the specialty bound as `?`.
pub const SEARCH_PROVIDERS_BY_SPECIALTY: &str = "SELECT provider_id, provider_speciality FROM providers WHERE provider_speciality IS NOT NULL AND provider_speciality = ?";

/// Identifies a directory query, for logging and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum QueryKind {
    Ping,
    ListPatients,
    ListProviders,
    SearchPatients,
    SearchProviders,
}

impl QueryKind {
    /// SQL text for this query. `bound` selects the variant taking a `?`
    /// parameter; queries without one ignore it.
    pub fn sql(self, bound: bool) -> &'static str {
        match (self, bound) {
            (QueryKind::Ping, _) => PING,
            (QueryKind::ListPatients, _) => LIST_PATIENTS,
            (QueryKind::ListProviders, _) => LIST_PROVIDERS,
            (QueryKind::SearchPatients, false) => SEARCH_PATIENTS,
            (QueryKind::SearchPatients, true) => SEARCH_PATIENTS_BY_FIRST_NAME,
            (QueryKind::SearchProviders, false) => SEARCH_PROVIDERS,
            (QueryKind::SearchProviders, true) => SEARCH_PROVIDERS_BY_SPECIALTY,
        }
    }
}
