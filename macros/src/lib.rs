use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, parse_quote, spanned::Spanned, Ident, ItemFn, LitStr, Stmt};

/// Test attribute used across cached-emitter's own test suites.
///
/// Sync functions become plain `#[test]`s. Async functions run on tokio:
///
/// - `#[cached_emitter_macro::test]` / `#[cached_emitter_macro::test(local)]`: current-thread
///   runtime.
/// - `#[cached_emitter_macro::test(shared)]`: multi-thread runtime.
/// - `#[cached_emitter_macro::test(paused)]`: current-thread runtime with the clock paused, so
///   timer-driven scenarios advance deterministically.
///
/// Every test installs a `tracing-subscriber` test writer filtered by `RUST_LOG`.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let mut input = parse_macro_input!(item as ItemFn);

  let is_async = input.sig.asyncness.is_some();

  let raw_args = proc_macro2::TokenStream::from(attr);
  let tokio_args = if raw_args.is_empty() {
    proc_macro2::TokenStream::new()
  } else {
    if !is_async {
      return TokenStream::from(
        syn::Error::new(
          raw_args.span(),
          "cached_emitter_macro::test flavor args are only supported for async tests. Use \
           #[cached_emitter_macro::test] for sync tests, or make the function async.",
        )
        .to_compile_error(),
      );
    }

    let flavor = if let Ok(ident) = syn::parse2::<Ident>(raw_args.clone()) {
      (ident.to_string(), ident.span())
    } else if let Ok(lit) = syn::parse2::<LitStr>(raw_args.clone()) {
      (lit.value(), lit.span())
    } else {
      return TokenStream::from(
        syn::Error::new(
          raw_args.span(),
          "cached_emitter_macro::test only accepts: local, shared, paused, or string equivalents",
        )
        .to_compile_error(),
      );
    };

    match flavor.0.as_str() {
      "local" => quote!(flavor = "current_thread"),
      "shared" => quote!(flavor = "multi_thread"),
      "paused" => quote!(flavor = "current_thread", start_paused = true),
      other => {
        return TokenStream::from(
          syn::Error::new(
            flavor.1,
            format!(
              "unknown flavor `{other}`: cached_emitter_macro::test only accepts local, shared \
               or paused"
            ),
          )
          .to_compile_error(),
        );
      }
    }
  };

  let init_tracing: Stmt = parse_quote! {
    let _ = ::tracing_subscriber::fmt()
      .with_test_writer()
      .with_env_filter(::tracing_subscriber::EnvFilter::from_default_env())
      .try_init();
  };
  input.block.stmts.insert(0, init_tracing);

  let attr = if is_async { quote!(tokio::test(#tokio_args)) } else { quote!(test) };

  let expanded = quote! {
      #[#attr]
      #input
  };

  TokenStream::from(expanded)
}
