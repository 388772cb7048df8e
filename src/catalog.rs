//! The registry of analytical questions.
//!
//! Every question is data: a [`Pipeline`] or a proximity configuration. The
//! built-in catalog holds the thirty standard questions; further questions
//! are added with [`Catalog::with_question`] or loaded from JSON, never by
//! writing new execution code.
//!
//! Depth classes are fixed across questions: shallow is shallower than
//! [`SHALLOW_DEPTH_KM`], deep is deeper than [`DEEP_DEPTH_KM`]. Question 3
//! keeps its own literal cut (`depth < 50 km and mag > 7.5`).
//!
//! Questions that rank or average an entity (countries, regions) leave out
//! rows whose entity is null. Tallies by category (alert level, status,
//! network, ...) report null as a category of its own.
//!
//! "Top k by X" questions rank only rows where X is known; fewer than k
//! known values give fewer than k rows.

use crate::compute::aggregate::{Aggregate, Reducer};
use crate::compute::expr::{Expr, Predicate, col, lit, pct_change};
use crate::compute::rank::SortKey;
use crate::compute::temporal::TimePart;
use crate::config::ProximityConfig;
use crate::error::{QueryError, Result};
use crate::pipeline::{GroupKey, Pipeline};
use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version of the catalog format and of the built-in question set.
pub const CATALOG_VERSION: u32 = 1;

/// Upper depth bound (exclusive) of a shallow event.
pub const SHALLOW_DEPTH_KM: f64 = 70.0;

/// Lower depth bound (exclusive) of a deep-focus event.
pub const DEEP_DEPTH_KM: f64 = 300.0;

/// Question identifier, displayed as `Q7`.
///
/// Parses from `"7"`, `"q7"`, `"Q07"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(u16);

impl QuestionId {
    pub const fn new(number: u16) -> Self {
        Self(number)
    }

    pub fn number(&self) -> u16 {
        self.0
    }
}

impl From<u16> for QuestionId {
    fn from(number: u16) -> Self {
        Self(number)
    }
}

impl FromStr for QuestionId {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('q')
            .or_else(|| trimmed.strip_prefix('Q'))
            .unwrap_or(trimmed);
        match digits.parse::<u16>() {
            Ok(n) if n > 0 => Ok(Self(n)),
            _ => Err(QueryError::UnknownQuestion(s.to_string())),
        }
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

/// What a question runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    Pipeline(Pipeline),
    Proximity(ProximityConfig),
}

impl Query {
    pub fn validate(&self) -> Result<()> {
        match self {
            Query::Pipeline(pipeline) => pipeline.validate(),
            Query::Proximity(config) => config.validate().map_err(QueryError::InvalidInput),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Question {
    pub id: QuestionId,
    pub title: String,
    pub query: Query,
}

impl Question {
    pub fn new(id: QuestionId, title: impl Into<String>, query: Query) -> Self {
        Self {
            id,
            title: title.into(),
            query,
        }
    }

    fn pipeline(id: u16, title: &str, pipeline: Pipeline) -> Self {
        Self::new(QuestionId(id), title, Query::Pipeline(pipeline))
    }
}

/// Ordered, validated set of questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCatalog")]
pub struct Catalog {
    version: u32,
    questions: Vec<Question>,
}

/// Unchecked serde form; deserialization goes through [`Catalog::new`].
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCatalog {
    version: u32,
    questions: Vec<Question>,
}

impl TryFrom<RawCatalog> for Catalog {
    type Error = QueryError;

    fn try_from(raw: RawCatalog) -> Result<Self> {
        if raw.version != CATALOG_VERSION {
            return Err(QueryError::InvalidInput(format!(
                "catalog version {} is not supported (expected {})",
                raw.version, CATALOG_VERSION
            )));
        }
        Catalog::new(raw.questions)
    }
}

static BUILTIN: Lazy<Catalog> = Lazy::new(|| Catalog {
    version: CATALOG_VERSION,
    questions: builtin_questions(),
});

impl Catalog {
    /// Validate and assemble a catalog.
    pub fn new(questions: Vec<Question>) -> Result<Self> {
        let mut seen = FxHashSet::default();
        for question in &questions {
            if !seen.insert(question.id) {
                return Err(QueryError::InvalidInput(format!(
                    "question {} is registered twice",
                    question.id
                )));
            }
            question.query.validate().map_err(|e| {
                QueryError::InvalidInput(format!("question {}: {}", question.id, e))
            })?;
        }
        Ok(Self {
            version: CATALOG_VERSION,
            questions,
        })
    }

    /// The thirty standard questions.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, id: QuestionId) -> Result<&Question> {
        self.questions
            .iter()
            .find(|q| q.id == id)
            .ok_or_else(|| QueryError::UnknownQuestion(id.to_string()))
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// `(id, title)` in catalog order.
    pub fn list(&self) -> Vec<(QuestionId, &str)> {
        self.questions
            .iter()
            .map(|q| (q.id, q.title.as_str()))
            .collect()
    }

    /// A copy extended with `question`.
    pub fn with_question(&self, question: Question) -> Result<Catalog> {
        let mut questions = self.questions.clone();
        questions.push(question);
        Catalog::new(questions)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Catalog> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        Catalog::try_from(raw)
    }
}

fn count_by(key: GroupKey) -> Pipeline {
    Pipeline::new()
        .group_by(key)
        .aggregate(Aggregate::count("total"))
}

fn shallow() -> Predicate {
    col("depth").lt(lit(SHALLOW_DEPTH_KM))
}

fn deep() -> Predicate {
    col("depth").gt(lit(DEEP_DEPTH_KM))
}

fn builtin_questions() -> Vec<Question> {
    let year = || GroupKey::temporal(TimePart::Year);
    let country = || GroupKey::column("country").drop_nulls();
    let region = || GroupKey::column("region").drop_nulls();

    vec![
        Question::pipeline(
            1,
            "Top 10 strongest earthquakes (mag)",
            Pipeline::new()
                .filter(col("mag").not_null())
                .columns(&["id", "mag", "place", "time"])
                .sort_by(SortKey::desc("mag"))
                .limit(10),
        ),
        Question::pipeline(
            2,
            "Top 10 deepest earthquakes (depth_km)",
            Pipeline::new()
                .filter(col("depth").not_null())
                .columns(&["id", "depth", "place", "mag", "time"])
                .sort_by(SortKey::desc("depth"))
                .limit(10),
        ),
        Question::pipeline(
            3,
            "Shallow earthquakes < 50 km and mag > 7.5",
            Pipeline::new()
                .filter(col("depth").lt(lit(50.0)))
                .filter(col("mag").gt(lit(7.5)))
                .columns(&["id", "place", "mag", "depth", "time"]),
        ),
        Question::pipeline(
            4,
            "Average depth per continent",
            Pipeline::new()
                .group_by(GroupKey::column("continent"))
                .aggregate(Aggregate::mean("avg_depth", col("depth"))),
        ),
        Question::pipeline(
            5,
            "Average magnitude per magnitude type (magType)",
            Pipeline::new()
                .group_by(GroupKey::column("magType"))
                .aggregate(Aggregate::mean("avg_mag", col("mag"))),
        ),
        Question::pipeline(
            6,
            "Year with most earthquakes",
            count_by(year()).sort_by(SortKey::desc("total")),
        ),
        Question::pipeline(
            7,
            "Month with highest number of earthquakes",
            count_by(GroupKey::temporal(TimePart::MonthName)).sort_by(SortKey::desc("total")),
        ),
        Question::pipeline(
            8,
            "Day of week with most earthquakes",
            count_by(GroupKey::temporal(TimePart::DayName)).sort_by(SortKey::desc("total")),
        ),
        Question::pipeline(
            9,
            "Count of earthquakes per hour",
            count_by(GroupKey::temporal(TimePart::Hour)),
        ),
        Question::pipeline(
            10,
            "Most active reporting network (net)",
            count_by(GroupKey::column("net")).sort_by(SortKey::desc("total")),
        ),
        Question::pipeline(
            11,
            "Top 5 places with highest casualties",
            Pipeline::new()
                .filter(col("casualties").not_null())
                .columns(&["id", "place", "casualties"])
                .sort_by(SortKey::desc("casualties"))
                .limit(5),
        ),
        Question::pipeline(
            12,
            "Total estimated economic loss per continent",
            Pipeline::new()
                .group_by(GroupKey::column("continent"))
                .aggregate(Aggregate::sum("total_loss", col("economic_loss"))),
        ),
        Question::pipeline(
            13,
            "Average economic loss by alert level",
            Pipeline::new()
                .group_by(GroupKey::column("alert"))
                .aggregate(Aggregate::mean("avg_loss", col("economic_loss"))),
        ),
        Question::pipeline(
            14,
            "Count reviewed vs automatic (status)",
            count_by(GroupKey::column("status")),
        ),
        Question::pipeline(
            15,
            "Count by earthquake type (type)",
            count_by(GroupKey::column("type")),
        ),
        Question::pipeline(
            16,
            "Number of earthquakes by data type (types)",
            count_by(GroupKey::column("types")),
        ),
        Question::pipeline(
            17,
            "Average RMS and gap per continent",
            Pipeline::new()
                .group_by(GroupKey::column("continent"))
                .aggregate(Aggregate::mean("avg_rms", col("rms")))
                .aggregate(Aggregate::mean("avg_gap", col("gap"))),
        ),
        Question::pipeline(
            18,
            "Events with high station coverage (nst > 50)",
            Pipeline::new()
                .filter(col("nst").gt(lit(50i64)))
                .columns(&["id", "place", "mag", "depth", "nst"]),
        ),
        Question::pipeline(
            19,
            "Number of tsunamis triggered per year",
            Pipeline::new()
                .filter(col("tsunami").eq(lit(true)))
                .group_by(year())
                .aggregate(Aggregate::count("tsunami_count")),
        ),
        Question::pipeline(
            20,
            "Count earthquakes by alert levels",
            count_by(GroupKey::column("alert")),
        ),
        Question::pipeline(
            21,
            "Top 5 countries with highest avg magnitude (10 yrs)",
            Pipeline::new()
                .filter(
                    Expr::temporal(TimePart::Year).ge(
                        Expr::whole(Reducer::Max, Expr::temporal(TimePart::Year)) - lit(10i64),
                    ),
                )
                .group_by(country())
                .aggregate(Aggregate::mean("avg_mag", col("mag")))
                .having(col("avg_mag").not_null())
                .sort_by(SortKey::desc("avg_mag"))
                .limit(5),
        ),
        Question::pipeline(
            22,
            "Countries with both shallow & deep EQ in same month",
            Pipeline::new()
                .group_by(country())
                .group_by(GroupKey::temporal(TimePart::MonthPeriod))
                .aggregate(Aggregate::any("has_shallow", shallow()))
                .aggregate(Aggregate::any("has_deep", deep()))
                .derive(
                    "both_shallow_deep",
                    col("has_shallow")
                        .eq(lit(true))
                        .and(col("has_deep").eq(lit(true)))
                        .test(),
                )
                .having(col("both_shallow_deep").eq(lit(true)))
                .keep(&["country", "month_period", "both_shallow_deep"]),
        ),
        Question::pipeline(
            23,
            "YoY growth in total earthquakes",
            count_by(year()).derive("yoy_growth", pct_change(col("total"))),
        ),
        Question::pipeline(
            24,
            "Top 3 most active regions (frequency + avg mag)",
            Pipeline::new()
                .group_by(region())
                .aggregate(Aggregate::count_of("freq", col("mag")))
                .aggregate(Aggregate::mean("avg_mag", col("mag")))
                .derive("score", col("freq") * col("avg_mag"))
                .sort_by(SortKey::desc("score"))
                .limit(3),
        ),
        Question::pipeline(
            25,
            "Avg depth for countries ±5° latitude from equator",
            Pipeline::new()
                .filter(col("latitude").abs().le(lit(5.0)))
                .group_by(country())
                .aggregate(Aggregate::mean("avg_depth", col("depth"))),
        ),
        Question::pipeline(
            26,
            "Countries with highest ratio shallow/deep",
            Pipeline::new()
                .group_by(country())
                .aggregate(Aggregate::count("shallow").filter(shallow()))
                .aggregate(Aggregate::count("deep").filter(deep()))
                .derive("ratio", col("shallow") / col("deep"))
                .sort_by(SortKey::desc("ratio")),
        ),
        Question::pipeline(
            27,
            "Avg magnitude diff: tsunami vs no-tsunami",
            Pipeline::new()
                .aggregate(
                    Aggregate::mean("avg_tsunami", col("mag"))
                        .filter(col("tsunami").eq(lit(true))),
                )
                .aggregate(
                    Aggregate::mean("avg_no_tsunami", col("mag"))
                        .filter(col("tsunami").eq(lit(false))),
                )
                .derive("mag_diff", col("avg_tsunami") - col("avg_no_tsunami")),
        ),
        Question::pipeline(
            28,
            "Lowest reliability using gap & rms",
            Pipeline::new()
                .columns(&["id", "place", "mag", "depth", "gap", "rms"])
                .select(
                    "error_score",
                    col("gap").fill_null(0.0) + col("rms").fill_null(0.0),
                )
                .sort_by(SortKey::desc("error_score")),
        ),
        Question::new(
            QuestionId(29),
            "Consecutive EQ within 50 km & 1 hour",
            Query::Proximity(ProximityConfig::default()),
        ),
        Question::pipeline(
            30,
            "Regions with most deep-focus EQ (depth > 300 km)",
            Pipeline::new()
                .filter(deep())
                .group_by(region())
                .aggregate(Aggregate::count("deep_count"))
                .sort_by(SortKey::desc("deep_count")),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid_and_ordered() {
        let builtin = Catalog::builtin();
        let rebuilt = Catalog::new(builtin.questions().to_vec()).unwrap();
        assert_eq!(&rebuilt, builtin);

        let ids: Vec<u16> = builtin.list().iter().map(|(id, _)| id.number()).collect();
        assert_eq!(ids, (1..=30).collect::<Vec<_>>());
    }

    #[test]
    fn test_question_id_parsing() {
        assert_eq!("7".parse::<QuestionId>().unwrap(), QuestionId::new(7));
        assert_eq!("q7".parse::<QuestionId>().unwrap(), QuestionId::new(7));
        assert_eq!(" Q07 ".parse::<QuestionId>().unwrap(), QuestionId::new(7));
        assert_eq!(QuestionId::new(7).to_string(), "Q7");

        for bad in ["", "q", "0", "x7", "-3", "7.5"] {
            assert!(matches!(
                bad.parse::<QuestionId>(),
                Err(QueryError::UnknownQuestion(_))
            ));
        }
    }

    #[test]
    fn test_unknown_lookup() {
        let err = Catalog::builtin().get(QuestionId::new(31)).unwrap_err();
        assert!(matches!(err, QueryError::UnknownQuestion(ref id) if id == "Q31"));
    }

    #[test]
    fn test_with_question_rejects_duplicates() {
        let extra = Question::pipeline(
            1,
            "Duplicate",
            Pipeline::new().aggregate(Aggregate::count("n")),
        );
        assert!(Catalog::builtin().with_question(extra).is_err());

        let extended = Catalog::builtin()
            .with_question(Question::pipeline(
                31,
                "Events per continent",
                count_by(GroupKey::column("continent")),
            ))
            .unwrap();
        assert_eq!(extended.len(), 31);
        assert_eq!(extended.get(QuestionId::new(31)).unwrap().title, "Events per continent");
    }

    #[test]
    fn test_json_roundtrip() {
        let json = Catalog::builtin().to_json().unwrap();
        let back = Catalog::from_json(&json).unwrap();
        assert_eq!(&back, Catalog::builtin());
    }

    #[test]
    fn test_json_version_checked() {
        let json = r#"{"version": 99, "questions": []}"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(QueryError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_deserialize_validates_questions() {
        let question = Question::pipeline(5, "Dup", count_by(GroupKey::column("net")));
        let json = serde_json::json!({
            "version": CATALOG_VERSION,
            "questions": [question.clone(), question],
        });
        assert!(serde_json::from_value::<Catalog>(json).is_err());

        let stale = serde_json::json!({"version": 0, "questions": []});
        assert!(serde_json::from_value::<Catalog>(stale).is_err());
    }

    #[test]
    fn test_invalid_question_rejected() {
        let broken = Question::pipeline(40, "Broken", Pipeline::new());
        let err = Catalog::new(vec![broken]).unwrap_err();
        assert!(err.to_string().contains("Q40"));
    }
}
