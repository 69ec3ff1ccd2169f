mod model;
mod route;

use proc_macro::TokenStream;

/// Creates a new documentation function for the route, named after the original function with the suffix `_docs`.
///
/// The first paragraph of the doc comment becomes the operation summary, the rest its description.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}

/// Creates two new structs next to the model: `CreateXInput` and `UpdateXInput`.
///
/// Fields marked `#[model(readonly)]` are left out of both inputs, fields marked
/// `#[model(immutable)]` are left out of the update input. Every other field is
/// copied with its `doc`, `serde`, `validate` and `schemars` attributes, and wrapped
/// in an `Option` for the update input.
#[proc_macro_attribute]
pub fn model(_args: TokenStream, input: TokenStream) -> TokenStream {
	model::from_input(input)
}
