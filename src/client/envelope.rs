use serde::Deserialize;

/// The shapes list endpoints have been seen to respond with.
///
/// The server answers with a `content` page, older deployments wrapped
/// lists in `data` or sent a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
	Bare(Vec<T>),
	Content { content: Vec<T> },
	Data { data: Vec<T> },
}

impl<T> ListEnvelope<T> {
	/// Whether the list is one page of a longer one.
	pub fn is_paged(&self) -> bool {
		matches!(self, Self::Content { .. })
	}

	pub fn into_vec(self) -> Vec<T> {
		match self {
			Self::Bare(items) | Self::Content { content: items } | Self::Data { data: items } => {
				items
			}
		}
	}
}
