//! Structured list filters and the translator for legacy SQL-like query strings.
//!
//! A [`Filter`] renders as the URL query fragment the JSON:API list endpoints expect:
//!
//! ```text
//! filter[operator]=and&filter[name][eq]=Acme&filter[date_entered][gt]=2020-01-01
//! ```
//!
//! Legacy queries such as `accounts.name = 'Acme' AND accounts.date_entered > DATE(2020-01-01)`
//! are converted with [`Filter::from_legacy_query`].

// crates.io
use url::form_urlencoded;
// self
use crate::_prelude::*;

/// Errors raised while translating a legacy query.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum FilterError {
	/// The query contained no clauses.
	#[error("Legacy query is empty.")]
	Empty,
	/// A clause did not have the `field operator value` shape.
	#[error("Legacy query clause `{clause}` is malformed.")]
	MalformedClause {
		/// Offending clause.
		clause: String,
	},
	/// A clause used an operator with no filter equivalent.
	#[error("Legacy query clause `{clause}` uses unsupported operator `{operator}`.")]
	UnsupportedOperator {
		/// Offending clause.
		clause: String,
		/// Operator as written.
		operator: String,
	},
}

/// Comparison operators understood by the list endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Comparison {
	/// `=`
	Eq,
	/// `!=`
	Neq,
	/// `>`
	Gt,
	/// `>=`
	Gte,
	/// `<`
	Lt,
	/// `<=`
	Lte,
	/// `like`
	Like,
}
impl Comparison {
	/// Returns the operator name used inside `filter[field][op]`.
	pub const fn as_str(self) -> &'static str {
		match self {
			Comparison::Eq => "eq",
			Comparison::Neq => "neq",
			Comparison::Gt => "gt",
			Comparison::Gte => "gte",
			Comparison::Lt => "lt",
			Comparison::Lte => "lte",
			Comparison::Like => "like",
		}
	}

	/// Maps a legacy SQL symbol (`=`, `!=`, `>=`, `like`, ...) to a comparison.
	pub fn from_symbol(symbol: &str) -> Option<Self> {
		let comparison = match symbol {
			"=" => Comparison::Eq,
			"!=" | "<>" => Comparison::Neq,
			">" => Comparison::Gt,
			">=" => Comparison::Gte,
			"<" => Comparison::Lt,
			"<=" => Comparison::Lte,
			other if other.eq_ignore_ascii_case("like") => Comparison::Like,
			_ => return None,
		};

		Some(comparison)
	}
}
impl Display for Comparison {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Connector joining all criteria of a filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Logical {
	/// Every criterion must match.
	#[default]
	And,
	/// Any criterion may match.
	Or,
}
impl Logical {
	/// Returns the lower-case connector name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Logical::And => "and",
			Logical::Or => "or",
		}
	}
}

/// Value side of a criterion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Criteria {
	/// `filter[field][op]=value`
	Single(String),
	/// `filter[field][op][]=a&filter[field][op][]=b`
	Multiple(Vec<String>),
}

/// One `field operator value` criterion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterTriplet {
	/// Comparison applied.
	pub comparison: Comparison,
	/// Field name without table prefix.
	pub field: String,
	/// Compared value(s).
	pub criteria: Criteria,
}
impl FilterTriplet {
	/// Creates a single-valued criterion.
	pub fn new(comparison: Comparison, field: impl Into<String>, value: impl Into<String>) -> Self {
		Self { comparison, field: field.into(), criteria: Criteria::Single(value.into()) }
	}

	/// Creates a multi-valued criterion.
	pub fn multi<I, S>(comparison: Comparison, field: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			comparison,
			field: field.into(),
			criteria: Criteria::Multiple(values.into_iter().map(Into::into).collect()),
		}
	}

	/// Renders the criterion; values are form-encoded.
	pub fn to_filter_string(&self) -> String {
		let prefix = format!("filter[{}][{}]", self.field, self.comparison.as_str());

		match &self.criteria {
			Criteria::Single(value) => format!("{prefix}={}", encode(value)),
			Criteria::Multiple(values) => values
				.iter()
				.map(|value| format!("{prefix}[]={}", encode(value)))
				.collect::<Vec<_>>()
				.join("&"),
		}
	}
}

/// Criteria joined by one logical connector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
	/// Connector between criteria.
	pub logical: Logical,
	/// Criteria in order of appearance.
	pub criteria: Vec<FilterTriplet>,
}
impl Filter {
	/// Creates a filter from explicit criteria.
	pub fn new(logical: Logical, criteria: Vec<FilterTriplet>) -> Self {
		Self { logical, criteria }
	}

	/// Appends a criterion.
	pub fn with(mut self, triplet: FilterTriplet) -> Self {
		self.criteria.push(triplet);

		self
	}

	/// Renders the URL query fragment.
	pub fn to_filter_string(&self) -> String {
		let mut buf = format!("filter[operator]={}", self.logical.as_str());

		for triplet in &self.criteria {
			buf.push('&');
			buf.push_str(&triplet.to_filter_string());
		}

		buf
	}

	/// Translates a legacy query into an `and` filter.
	///
	/// Clauses are separated by ` AND `. Each clause is `field op value` or `field like value`;
	/// `DATE(...)` wrappers and single quotes around values are removed, and `table.` prefixes
	/// are dropped from field names.
	pub fn from_legacy_query(query: &str) -> Result<Self, FilterError> {
		if query.trim().is_empty() {
			return Err(FilterError::Empty);
		}

		let criteria = query.split(" AND ").map(parse_clause).collect::<Result<Vec<_>, _>>()?;

		Ok(Self { logical: Logical::And, criteria })
	}
}
impl FromStr for Filter {
	type Err = FilterError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_legacy_query(s)
	}
}

fn parse_clause(raw: &str) -> Result<FilterTriplet, FilterError> {
	let clause = raw.trim();
	let malformed = || FilterError::MalformedClause { clause: clause.to_owned() };
	// ASCII lowering keeps byte offsets aligned with `clause`.
	let (field, comparison, value) = match clause.to_ascii_lowercase().find(" like ") {
		Some(idx) => (&clause[..idx], Comparison::Like, &clause[idx + " like ".len()..]),
		None => {
			let (field, rest) = clause.split_once(char::is_whitespace).ok_or_else(malformed)?;
			let (operator, value) =
				rest.trim_start().split_once(char::is_whitespace).ok_or_else(malformed)?;
			let comparison = Comparison::from_symbol(operator).ok_or_else(|| {
				FilterError::UnsupportedOperator {
					clause: clause.to_owned(),
					operator: operator.to_owned(),
				}
			})?;

			(field, comparison, value)
		},
	};
	let field = unwrap_date(field.trim());
	let field = field.rsplit('.').next().unwrap_or(field);
	let value = unwrap_date(value.trim()).trim_matches('\'');

	if field.is_empty() || value.is_empty() {
		return Err(malformed());
	}

	Ok(FilterTriplet::new(comparison, field, value))
}

fn unwrap_date(value: &str) -> &str {
	value
		.strip_prefix("DATE(")
		.and_then(|inner| inner.strip_suffix(')'))
		.map(str::trim)
		.unwrap_or(value)
}

fn encode(value: &str) -> String {
	form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn renders_operator_then_criteria() {
		let filter = Filter::new(Logical::Or, Vec::new())
			.with(FilterTriplet::new(Comparison::Eq, "name", "Acme"))
			.with(FilterTriplet::new(Comparison::Gte, "employees", "10"));

		assert_eq!(
			filter.to_filter_string(),
			"filter[operator]=or&filter[name][eq]=Acme&filter[employees][gte]=10"
		);
	}

	#[test]
	fn multi_valued_criteria_use_array_suffix_and_encoding() {
		let triplet = FilterTriplet::multi(Comparison::Eq, "industry", ["Retail", "Real Estate"]);

		assert_eq!(
			triplet.to_filter_string(),
			"filter[industry][eq][]=Retail&filter[industry][eq][]=Real+Estate"
		);
		assert_eq!(
			FilterTriplet::new(Comparison::Like, "name", "Ac%&").to_filter_string(),
			"filter[name][like]=Ac%25%26"
		);
	}

	#[test]
	fn legacy_queries_translate_to_and_filters() {
		let filter = Filter::from_legacy_query(
			"accounts.name = 'Acme' AND accounts.date_entered > DATE(2020-01-01) AND accounts.city like 'Ber%'",
		)
		.expect("Legacy query should translate.");

		assert_eq!(filter.logical, Logical::And);
		assert_eq!(
			filter.criteria,
			vec![
				FilterTriplet::new(Comparison::Eq, "name", "Acme"),
				FilterTriplet::new(Comparison::Gt, "date_entered", "2020-01-01"),
				FilterTriplet::new(Comparison::Like, "city", "Ber%"),
			]
		);
		assert_eq!(
			filter.to_filter_string(),
			"filter[operator]=and&filter[name][eq]=Acme&filter[date_entered][gt]=2020-01-01&filter[city][like]=Ber%25"
		);
	}

	#[test]
	fn legacy_values_may_contain_spaces() {
		let filter: Filter = "accounts.name != 'Acme Corp'".parse().expect("Clause should parse.");

		assert_eq!(filter.criteria, vec![FilterTriplet::new(Comparison::Neq, "name", "Acme Corp")]);
	}

	#[test]
	fn malformed_legacy_queries_are_rejected() {
		assert_eq!(Filter::from_legacy_query("  "), Err(FilterError::Empty));
		assert!(matches!(
			Filter::from_legacy_query("accounts.name"),
			Err(FilterError::MalformedClause { .. })
		));
		assert!(matches!(
			Filter::from_legacy_query("accounts.name ~ 'x'"),
			Err(FilterError::UnsupportedOperator { ref operator, .. }) if operator == "~"
		));
	}
}
