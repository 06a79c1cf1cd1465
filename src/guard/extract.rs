//! Token extraction contracts that keep the guard independent of any transport type.

// self
use crate::_prelude::*;

/// Raised when a request carries no usable token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("Missing token.")]
pub struct MissingToken;

/// Pulls a raw token out of a transport-specific request.
///
/// Any `Fn(&Request) -> Option<String>` closure is an extractor; empty strings count as missing.
pub trait TokenExtractor<Request>
where
	Self: Send + Sync,
{
	/// Returns the raw token carried by `request`.
	fn extract_token(&self, request: &Request) -> Result<String, MissingToken>;
}
impl<Request, F> TokenExtractor<Request> for F
where
	F: Fn(&Request) -> Option<String> + Send + Sync,
{
	fn extract_token(&self, request: &Request) -> Result<String, MissingToken> {
		self(request).filter(|token| !token.is_empty()).ok_or(MissingToken)
	}
}

/// Tries each extractor in order and returns the first token found.
pub struct FirstOf<Request> {
	extractors: Vec<Box<dyn TokenExtractor<Request>>>,
}
impl<Request> FirstOf<Request> {
	/// Starts a chain with a single extractor.
	pub fn new(extractor: impl TokenExtractor<Request> + 'static) -> Self {
		Self { extractors: vec![Box::new(extractor)] }
	}

	/// Appends a fallback extractor.
	pub fn or(mut self, extractor: impl TokenExtractor<Request> + 'static) -> Self {
		self.extractors.push(Box::new(extractor));

		self
	}
}
impl<Request> TokenExtractor<Request> for FirstOf<Request> {
	fn extract_token(&self, request: &Request) -> Result<String, MissingToken> {
		self.extractors
			.iter()
			.find_map(|extractor| extractor.extract_token(request).ok())
			.ok_or(MissingToken)
	}
}
impl<Request> Debug for FirstOf<Request> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FirstOf").field("extractors", &self.extractors.len()).finish()
	}
}

/// Parses an `Authorization` header value of the form `Bearer <token>`.
///
/// The scheme is matched case-insensitively; anything else yields `None`.
pub fn bearer_token(header: &str) -> Option<&str> {
	let (scheme, token) = header.trim().split_once(' ')?;

	if !scheme.eq_ignore_ascii_case("bearer") {
		return None;
	}

	let token = token.trim();

	(!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	struct Request {
		headers: HashMap<&'static str, &'static str>,
		query: HashMap<&'static str, &'static str>,
	}

	fn header(request: &Request) -> Option<String> {
		request.headers.get("authorization").and_then(|value| bearer_token(value)).map(str::to_owned)
	}

	fn query(request: &Request) -> Option<String> {
		request.query.get("token").map(|value| (*value).to_owned())
	}

	#[test]
	fn bearer_token_parses_the_scheme() {
		assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
		assert_eq!(bearer_token("  bearer   abc123 "), Some("abc123"));
		assert_eq!(bearer_token("Basic abc123"), None);
		assert_eq!(bearer_token("Bearer "), None);
		assert_eq!(bearer_token("abc123"), None);
	}

	#[test]
	fn first_of_falls_back_in_order() {
		let chain = FirstOf::new(header).or(query);
		let both = Request {
			headers: HashMap::from([("authorization", "Bearer from-header")]),
			query: HashMap::from([("token", "from-query")]),
		};
		let query_only =
			Request { headers: HashMap::new(), query: HashMap::from([("token", "from-query")]) };
		let neither = Request { headers: HashMap::new(), query: HashMap::from([("token", "")]) };

		assert_eq!(chain.extract_token(&both), Ok("from-header".into()));
		assert_eq!(chain.extract_token(&query_only), Ok("from-query".into()));
		assert_eq!(chain.extract_token(&neither), Err(MissingToken));
	}
}
