use super::domain::{
    ApplicantForm, ApplicantIdentity, FeatureSet, IntakeSubmission, DEPENDENTS, EXPENSES, INCOME,
    TXN_COUNT,
};
use super::transactions;

/// Typed view of an intake request, ready for scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedApplicant {
    pub identity: ApplicantIdentity,
    pub features: FeatureSet,
    /// Upload decoded as lossy UTF-8 with NUL characters removed, or empty when no file was sent.
    pub raw_transaction_text: String,
}

impl NormalizedApplicant {
    pub fn has_transaction_features(&self) -> bool {
        self.features.contains(TXN_COUNT)
    }
}

/// Coerces the applicant fields and merges transaction features when a file is present.
///
/// Identity fields are not validated here; format checks belong to the caller.
pub fn normalize(submission: IntakeSubmission) -> NormalizedApplicant {
    let IntakeSubmission {
        form,
        transactions: upload,
    } = submission;
    let ApplicantForm {
        name,
        phone,
        email,
        income,
        expenses,
        dependents,
    } = form;

    let mut features = FeatureSet::new();
    features.insert(INCOME, coerce_number(income.as_deref()));
    features.insert(EXPENSES, coerce_number(expenses.as_deref()));
    features.insert(DEPENDENTS, coerce_number(dependents.as_deref()));

    let raw_transaction_text = match upload {
        Some(bytes) => {
            features.merge(transactions::extract(&bytes));
            upload_text(&bytes)
        }
        None => String::new(),
    };

    NormalizedApplicant {
        identity: ApplicantIdentity { name, phone, email },
        features,
        raw_transaction_text,
    }
}

/// Text kept for the audit trail. PostgreSQL `TEXT` cannot hold `\0`, so it is dropped.
pub fn upload_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('\0', "")
}

/// Absent, blank, non-numeric, and non-finite input all become `0`.
pub fn coerce_number(raw: Option<&str>) -> f64 {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}
