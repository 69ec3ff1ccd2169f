use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// These can be removed when [`serde`] supports
/// literal defaults: <https://github.com/serde-rs/serde/issues/368>
#[inline]
fn one() -> i64 {
	1
}

#[inline]
fn twenty() -> i64 {
	20
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
pub struct Paginate {
	/// The page number to return (1-indexed).
	#[validate(range(min = 1, max = 1000))]
	#[serde(default = "one")]
	pub page: i64,
	/// The number of items to return per page.
	#[validate(range(min = 1, max = 100))]
	#[serde(default = "twenty")]
	pub size: i64,
}

impl Default for Paginate {
	fn default() -> Self {
		Self {
			page: one(),
			size: twenty(),
		}
	}
}

impl Paginate {
	pub fn offset(&self) -> i64 {
		(self.page - 1) * self.size
	}

	pub fn limit(&self) -> i64 {
		self.size
	}

	/// Applies the pagination to an in-memory iterator.
	pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
		items
			.into_iter()
			.skip(usize::try_from(self.offset()).unwrap_or(0))
			.take(usize::try_from(self.limit()).unwrap_or(0))
			.collect()
	}
}

/// A page of results. Every list endpoint responds with this envelope.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct Page<T> {
	pub content: Vec<T>,
	pub page: i64,
	pub size: i64,
}

impl<T> Page<T> {
	pub fn new(content: Vec<T>, paginate: &Paginate) -> Self {
		Self {
			content,
			page: paginate.page,
			size: paginate.size,
		}
	}
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct IdInput {
	pub id: Uuid,
}

#[cfg(test)]
mod test {
	#[test]
	fn test_paginate_offset() {
		let mut paginate = super::Paginate { page: 1, size: 10 };

		assert_eq!(paginate.offset(), 0);

		paginate.page = 2;

		assert_eq!(paginate.offset(), 10);

		paginate.size = 5;

		assert_eq!(paginate.offset(), 5);

		paginate.page = 3;

		assert_eq!(paginate.offset(), 10);
	}

	#[test]
	fn test_paginate_limit() {
		let paginate = super::Paginate { page: 1, size: 10 };

		assert_eq!(paginate.limit(), 10);
	}

	#[test]
	fn test_paginate_apply() {
		let paginate = super::Paginate { page: 2, size: 3 };

		assert_eq!(paginate.apply(1..=10), vec![4, 5, 6]);
		assert!(super::Paginate { page: 5, size: 3 }.apply(1..=10).is_empty());
	}
}
