use darling::{ast, util::Flag, FromDeriveInput, FromField};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Type};

#[derive(FromDeriveInput)]
#[darling(supports(struct_named))]
struct ModelInputReceiver {
	ident: syn::Ident,
	vis: syn::Visibility,

	data: ast::Data<(), ModelFieldReceiver>,
}

/// Only the attributes listed in `forward_attrs` are copied onto the generated inputs.
#[derive(FromField)]
#[darling(attributes(model), forward_attrs(doc, serde, validate, schemars))]
struct ModelFieldReceiver {
	ident: Option<syn::Ident>,

	ty: syn::Type,
	vis: syn::Visibility,

	attrs: Vec<syn::Attribute>,

	/// Left out of both inputs.
	readonly: Flag,
	/// Left out of the update input.
	immutable: Flag,
}

fn is_option(ty: &Type) -> bool {
	let Type::Path(path) = ty else {
		return false;
	};

	path.path
		.segments
		.last()
		.is_some_and(|segment| segment.ident == "Option")
}

/// `#[model(...)]` is only meaningful to this macro, so it is removed from the emitted struct.
fn strip_model_attrs(input: &mut DeriveInput) {
	if let Data::Struct(ref mut data) = input.data {
		for field in data.fields.iter_mut() {
			field.attrs.retain(|attr| !attr.path().is_ident("model"));
		}
	}
}

pub fn from_input(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
	let mut input = syn::parse_macro_input!(input as DeriveInput);
	let receiver = match ModelInputReceiver::from_derive_input(&input) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	strip_model_attrs(&mut input);

	let expanded = expand(receiver);

	quote! {
		#input

		#expanded
	}
	.into()
}

fn expand(receiver: ModelInputReceiver) -> TokenStream {
	let fields = receiver.data.take_struct().expect("expected struct");

	let mut create_fields = Vec::new();
	let mut update_fields = Vec::new();

	for field in fields.iter().filter(|field| !field.readonly.is_present()) {
		let ident = &field.ident;
		let ty = &field.ty;
		let vis = &field.vis;
		let attrs = &field.attrs;

		create_fields.push(quote! {
			#(#attrs)*
			#vis #ident: #ty,
		});

		if field.immutable.is_present() {
			continue;
		}

		let update_ty = if is_option(ty) {
			quote!(#ty)
		} else {
			quote!(::core::option::Option<#ty>)
		};

		update_fields.push(quote! {
			#(#attrs)*
			#[serde(skip_serializing_if = "Option::is_none")]
			#vis #ident: #update_ty,
		});
	}

	let ident = &receiver.ident;
	let vis = &receiver.vis;
	let create_ident = format_ident!("Create{}Input", ident);
	let update_ident = format_ident!("Update{}Input", ident);
	let create_doc = format!("Input used to create a [`{}`].", ident);
	let update_doc = format!(
		"Input used to update a [`{}`]. Absent fields are left unchanged.",
		ident
	);

	quote! {
		#[doc = #create_doc]
		#[derive(Debug, Clone, ::serde::Deserialize, ::serde::Serialize, ::schemars::JsonSchema, ::validator::Validate)]
		#vis struct #create_ident {
			#(#create_fields)*
		}

		#[doc = #update_doc]
		#[derive(Debug, Clone, Default, ::serde::Deserialize, ::serde::Serialize, ::schemars::JsonSchema, ::validator::Validate)]
		#vis struct #update_ident {
			#(#update_fields)*
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn receive(input: DeriveInput) -> darling::Result<ModelInputReceiver> {
		ModelInputReceiver::from_derive_input(&input)
	}

	#[test]
	fn test_field_options() {
		let receiver = receive(syn::parse_quote! {
			pub struct Post {
				#[model(readonly)]
				pub secret: u32,
				#[model(immutable)]
				#[serde(default)]
				pub kind: String,
				/// The title.
				#[sqlx(rename = "name")]
				pub title: String,
			}
		})
		.unwrap();

		let expanded = expand(receiver).to_string();
		let (create, update) = expanded.split_once("UpdatePostInput").unwrap();

		assert!(!expanded.contains("secret"));
		assert!(!expanded.contains("sqlx"));
		assert!(create.contains("kind"));
		assert!(!update.contains("kind"));
		assert!(update.contains("Option < String >"));
	}

	#[test]
	fn test_unknown_option() {
		let result = receive(syn::parse_quote! {
			pub struct Post {
				#[model(hidden)]
				pub id: u32,
			}
		});

		assert!(result.is_err());
	}

	#[test]
	fn test_model_attrs_are_stripped() {
		let mut input: DeriveInput = syn::parse_quote! {
			pub struct Post {
				#[model(readonly)]
				#[serde(default)]
				pub id: u32,
			}
		};

		strip_model_attrs(&mut input);

		let tokens = quote!(#input).to_string();

		assert!(!tokens.contains("model"));
		assert!(tokens.contains("serde"));
	}
}
