//! Procedural macros for testkit-pipeline
//!
//! This crate provides the `#[testkit_pipeline::test]` attribute macro, which
//! builds a `TestPipeline` for the test and runs its deferred checks when the
//! test body returns.
//!
//! # Example
//!
//! ```rust,ignore
//! use testkit_pipeline::prelude::*;
//!
//! #[testkit_pipeline::test]
//! fn my_test(pipeline: &TestPipeline) {
//!     let numbers = pipeline.create(vec![1, 2, 3]);
//!     assert_that!(numbers, should have_size(3));
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, FnArg, Ident, ItemFn, Lit, Pat, ReturnType, Token, Type,
};

/// Configuration options for the test macro.
#[derive(Default)]
struct TestConfig {
    /// Start from `PipelineConfig::from_env()` instead of the defaults
    from_env: bool,
    /// Stop evaluating after the first failed check
    fail_fast: Option<bool>,
    /// Panic when the pipeline is dropped with unevaluated checks
    enforce_run: Option<bool>,
    /// Elements listed in failure messages before truncating
    max_listed_items: Option<usize>,
}

fn parse_bool(ident: &Ident, lit: Lit) -> syn::Result<bool> {
    match lit {
        Lit::Bool(b) => Ok(b.value()),
        other => Err(syn::Error::new_spanned(
            other,
            format!("`{ident}` expects a boolean"),
        )),
    }
}

impl Parse for TestConfig {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut config = TestConfig::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let lit: Lit = input.parse()?;

            match ident.to_string().as_str() {
                "from_env" => config.from_env = parse_bool(&ident, lit)?,
                "fail_fast" => config.fail_fast = Some(parse_bool(&ident, lit)?),
                "enforce_run" => config.enforce_run = Some(parse_bool(&ident, lit)?),
                "max_listed_items" => {
                    if let Lit::Int(i) = lit {
                        config.max_listed_items = Some(i.base10_parse()?);
                    } else {
                        return Err(syn::Error::new_spanned(
                            lit,
                            "`max_listed_items` expects an integer",
                        ));
                    }
                }
                _ => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {ident}"),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(config)
    }
}

impl TestConfig {
    fn to_tokens(&self) -> TokenStream2 {
        let mut config = if self.from_env {
            quote! { ::testkit_pipeline::pipeline::PipelineConfig::from_env() }
        } else {
            quote! { ::testkit_pipeline::pipeline::PipelineConfig::default() }
        };
        if let Some(fail_fast) = self.fail_fast {
            config = quote! { #config.with_fail_fast(#fail_fast) };
        }
        if let Some(enforce_run) = self.enforce_run {
            config = quote! { #config.with_enforce_run(#enforce_run) };
        }
        if let Some(max) = self.max_listed_items {
            config = quote! { #config.with_max_listed_items(#max) };
        }
        config
    }
}

/// Determines if a function parameter is requesting the pipeline.
fn is_pipeline_param(arg: &FnArg) -> bool {
    if let FnArg::Typed(pat_type) = arg {
        let ty = match &*pat_type.ty {
            Type::Reference(reference) => &*reference.elem,
            other => other,
        };
        if let Type::Path(type_path) = ty {
            if let Some(segment) = type_path.path.segments.last() {
                return segment.ident == "TestPipeline";
            }
        }
    }
    false
}

/// Extracts the parameter name from a function argument.
fn get_param_name(arg: &FnArg) -> Option<&Pat> {
    if let FnArg::Typed(pat_type) = arg {
        Some(&pat_type.pat)
    } else {
        None
    }
}

/// Test attribute macro for pipeline tests.
///
/// The test receives a fresh `TestPipeline`. After the body returns, every
/// check registered on the pipeline is evaluated and the test fails with the
/// collected failure messages if any check failed.
///
/// # Basic Usage
///
/// ```rust,ignore
/// use testkit_pipeline::prelude::*;
///
/// #[testkit_pipeline::test]
/// fn test_counts(pipeline: &TestPipeline) {
///     let counts = pipeline.create(vec![("a".to_string(), 1), ("b".to_string(), 2)]);
///     assert_that!(counts, should equal_map_of(vec![("a".to_string(), 1), ("b".to_string(), 2)]));
/// }
/// ```
///
/// # Configuration Options
///
/// - `from_env = true` - Start from `PipelineConfig::from_env()`
/// - `fail_fast = true` - Stop evaluating after the first failed check
/// - `enforce_run = false` - Do not panic on unevaluated checks
/// - `max_listed_items = 5` - Truncate element listings in failure messages
///
/// ```rust,ignore
/// #[testkit_pipeline::test(fail_fast = true, max_listed_items = 5)]
/// fn test_configured(pipeline: &TestPipeline) {
///     assert!(pipeline.config().fail_fast);
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = parse_macro_input!(attr as TestConfig);
    let input = parse_macro_input!(item as ItemFn);

    expand_test(&config, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_test(config: &TestConfig, input: ItemFn) -> syn::Result<TokenStream2> {
    let name = &input.sig.ident;
    let body = &input.block;
    let attrs = &input.attrs;
    let vis = &input.vis;

    if input.sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            &input.sig,
            "pipeline tests are synchronous; remove `async`",
        ));
    }
    if !matches!(input.sig.output, ReturnType::Default) {
        return Err(syn::Error::new_spanned(
            &input.sig.output,
            "test function must not return a value",
        ));
    }
    if input.sig.inputs.len() > 1 {
        return Err(syn::Error::new_spanned(
            &input.sig.inputs,
            "test function takes at most one parameter: `pipeline: &TestPipeline`",
        ));
    }

    let param = match input.sig.inputs.first() {
        None => None,
        Some(arg) if is_pipeline_param(arg) => {
            if let FnArg::Typed(pat_type) = arg {
                if !matches!(&*pat_type.ty, Type::Reference(_)) {
                    return Err(syn::Error::new_spanned(
                        &pat_type.ty,
                        "take the pipeline by reference: `&TestPipeline`",
                    ));
                }
            }
            get_param_name(arg)
        }
        Some(arg) => {
            return Err(syn::Error::new_spanned(
                arg,
                "expected a `&TestPipeline` parameter",
            ));
        }
    };

    let config = config.to_tokens();
    let run_body = match param {
        Some(param_name) => quote! {
            let __testkit_body = |#param_name: &::testkit_pipeline::pipeline::TestPipeline| #body;
            __testkit_body(&__testkit_pipeline);
        },
        None => quote! {
            let __testkit_body = || #body;
            __testkit_body();
        },
    };

    Ok(quote! {
        #[::core::prelude::v1::test]
        #(#attrs)*
        #vis fn #name() {
            let __testkit_pipeline =
                ::testkit_pipeline::pipeline::TestPipeline::with_config(#config);
            #run_body
            if let ::core::result::Result::Err(error) = __testkit_pipeline.run() {
                ::core::panic!("{}", error);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{expand_test, is_pipeline_param, TestConfig};
    use syn::{FnArg, ItemFn};

    #[::core::prelude::v1::test]
    fn test_config_parse_empty() {
        let config: TestConfig = syn::parse_str("").unwrap();
        assert!(!config.from_env);
        assert!(config.fail_fast.is_none());
        assert!(config.enforce_run.is_none());
        assert!(config.max_listed_items.is_none());
    }

    #[::core::prelude::v1::test]
    fn test_config_parse_multiple() {
        let config: TestConfig =
            syn::parse_str("fail_fast = true, enforce_run = false, max_listed_items = 5").unwrap();
        assert_eq!(config.fail_fast, Some(true));
        assert_eq!(config.enforce_run, Some(false));
        assert_eq!(config.max_listed_items, Some(5));
    }

    #[::core::prelude::v1::test]
    fn test_config_rejects_unknown_and_mistyped() {
        assert!(syn::parse_str::<TestConfig>("runner = \"direct\"").is_err());
        assert!(syn::parse_str::<TestConfig>("fail_fast = 1").is_err());
        assert!(syn::parse_str::<TestConfig>("max_listed_items = true").is_err());
    }

    #[::core::prelude::v1::test]
    fn test_pipeline_param_detection() {
        let by_ref: FnArg = syn::parse_str("pipeline: &TestPipeline").unwrap();
        let by_path: FnArg =
            syn::parse_str("p: &testkit_pipeline::pipeline::TestPipeline").unwrap();
        let other: FnArg = syn::parse_str("window: &Window").unwrap();
        assert!(is_pipeline_param(&by_ref));
        assert!(is_pipeline_param(&by_path));
        assert!(!is_pipeline_param(&other));
    }

    #[::core::prelude::v1::test]
    fn test_expand_rejects_async_and_by_value() {
        let config = TestConfig::default();
        let async_fn: ItemFn = syn::parse_str("async fn t() {}").unwrap();
        assert!(expand_test(&config, async_fn).is_err());
        let by_value: ItemFn = syn::parse_str("fn t(pipeline: TestPipeline) {}").unwrap();
        assert!(expand_test(&config, by_value).is_err());
        let ok: ItemFn = syn::parse_str("fn t(pipeline: &TestPipeline) {}").unwrap();
        assert!(expand_test(&config, ok).is_ok());
    }
}
