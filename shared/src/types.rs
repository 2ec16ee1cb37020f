use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};
use std::fmt;

/// Terminal status of a `Solution`. Stored as lowercase text in the
/// `solution.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolutionStatus {
    Testing,
    Completed,
    Error,
}

impl SolutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SolutionStatus::Testing => "testing",
            SolutionStatus::Completed => "completed",
            SolutionStatus::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SolutionStatus::Completed | SolutionStatus::Error)
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SolutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "testing" => Ok(SolutionStatus::Testing),
            "completed" => Ok(SolutionStatus::Completed),
            "error" => Ok(SolutionStatus::Error),
            other => Err(format!("unknown solution status: {other}")),
        }
    }
}

impl Type<Postgres> for SolutionStatus {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for SolutionStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <String as Decode<Postgres>>::decode(value)?;
        raw.parse::<SolutionStatus>().map_err(Into::into)
    }
}

impl<'q> Encode<'q, Postgres> for SolutionStatus {
    fn encode_by_ref(
        &self,
        buf: &mut PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as Encode<Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// Judge verdict for a single test-case execution. Canonical ordering and
/// numeric ids follow the upstream judge's status table; stored as the
/// numeric id in `solution_result.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum JudgeVerdict {
    InQueue = 1,
    Processing = 2,
    Accepted = 3,
    WrongAnswer = 4,
    TimeLimitExceeded = 5,
    CompilationError = 6,
    RuntimeSigsev = 7,
    RuntimeSigxfsz = 8,
    RuntimeSigfpe = 9,
    RuntimeSigabrt = 10,
    RuntimeNzec = 11,
    RuntimeOther = 12,
    InternalError = 13,
    ExecFormatError = 14,
}

impl JudgeVerdict {
    pub fn is_success(self) -> bool {
        matches!(self, JudgeVerdict::Accepted)
    }

    pub fn from_judge_id(id: i32) -> Option<Self> {
        Some(match id {
            1 => JudgeVerdict::InQueue,
            2 => JudgeVerdict::Processing,
            3 => JudgeVerdict::Accepted,
            4 => JudgeVerdict::WrongAnswer,
            5 => JudgeVerdict::TimeLimitExceeded,
            6 => JudgeVerdict::CompilationError,
            7 => JudgeVerdict::RuntimeSigsev,
            8 => JudgeVerdict::RuntimeSigxfsz,
            9 => JudgeVerdict::RuntimeSigfpe,
            10 => JudgeVerdict::RuntimeSigabrt,
            11 => JudgeVerdict::RuntimeNzec,
            12 => JudgeVerdict::RuntimeOther,
            13 => JudgeVerdict::InternalError,
            14 => JudgeVerdict::ExecFormatError,
            _ => return None,
        })
    }
}

impl Type<Postgres> for JudgeVerdict {
    fn type_info() -> PgTypeInfo {
        <i32 as Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for JudgeVerdict {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i32 as Decode<Postgres>>::decode(value)?;
        JudgeVerdict::from_judge_id(raw)
            .ok_or_else(|| format!("unknown judge verdict id: {raw}").into())
    }
}

impl<'q> Encode<'q, Postgres> for JudgeVerdict {
    fn encode_by_ref(
        &self,
        buf: &mut PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <i32 as Encode<Postgres>>::encode_by_ref(&(*self as i32), buf)
    }
}

/// Dimension for `statistics_by_user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatDimension {
    Category,
    Difficulty,
}

impl StatDimension {
    pub fn column(self) -> &'static str {
        match self {
            StatDimension::Category => "category",
            StatDimension::Difficulty => "difficulty",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn solution_status_round_trips_through_str() {
        for status in [
            SolutionStatus::Testing,
            SolutionStatus::Completed,
            SolutionStatus::Error,
        ] {
            assert_eq!(SolutionStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn only_completed_and_error_are_terminal() {
        assert!(!SolutionStatus::Testing.is_terminal());
        assert!(SolutionStatus::Completed.is_terminal());
        assert!(SolutionStatus::Error.is_terminal());
    }

    #[test]
    fn judge_verdict_ids_round_trip() {
        for id in 1..=14 {
            assert_eq!(JudgeVerdict::from_judge_id(id).unwrap() as i32, id);
        }
        assert!(JudgeVerdict::from_judge_id(0).is_none());
        assert!(JudgeVerdict::from_judge_id(15).is_none());
    }

    #[test]
    fn only_accepted_is_a_success() {
        assert!(JudgeVerdict::Accepted.is_success());
        assert!(!JudgeVerdict::WrongAnswer.is_success());
        assert!(!JudgeVerdict::TimeLimitExceeded.is_success());
    }
}
