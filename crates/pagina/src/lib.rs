//! Pagina: page object construction for browser UI tests
//!
//! Pagina (Spanish: "page") compiles declarative descriptions of named UI
//! elements and nested regions into typed accessor objects, and composes
//! them into a tree mirroring on-screen structure. Element location and
//! interaction stay behind an abstract element-provider contract; Pagina
//! owns the declaration-to-accessor compilation and the region
//! composition engine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     PAGINA Architecture                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌─────────────┐    ┌──────────────┐         │
//! │   │ Schema     │    │ Compiled    │    │ Element      │         │
//! │   │ (declare)  │───►│ Accessors + │───►│ Provider     │         │
//! │   │            │    │ Region Tree │    │ (collaborator)│        │
//! │   └────────────┘    └─────────────┘    └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use pagina::{Criteria, Entity, MockDom, MockNode, SchemaBuilder};
//!
//! let dom = MockDom::new(
//!     MockNode::new("browser")
//!         .child(MockNode::new("text_field").attr("id", "name").value("Ada")),
//! );
//! let schema = SchemaBuilder::new("ProfilePage")
//!     .text_field("name", Criteria::new().with("id", "name"))
//!     .build();
//! let page = Entity::new(schema, dom.scope()).unwrap();
//! assert_eq!(page.read("name").unwrap().as_text(), Some("Ada"));
//! page.set("name", "Grace").unwrap();
//! assert_eq!(page.read("name").unwrap().as_text(), Some("Grace"));
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// Accessor compilation: declarations into typed operations
pub mod accessor;
/// Capability registry: which tags read, click, set, and select
pub mod capability;
/// Locator criteria and the native/predicate partitioner
pub mod criteria;
/// Region-readiness initializer hooks
pub mod initializer;
/// In-memory element provider for tests
pub mod mock;
/// Pluralization against the provider surface
pub mod plural;
/// The element-provider contract
pub mod provider;
/// Runtime entities and the region composition engine
pub mod region;
/// Result and error types
pub mod result;
/// Declaration-time schemas and the namespace registry
pub mod schema;

pub use accessor::{CompiledElement, OpSet, ReadValue, WriteStrategy};
pub use capability::{CapabilityRegistry, ReadStrategy};
pub use criteria::{partition, Criteria, CriterionValue, PartitionedCriteria, ALWAYS_NATIVE_KEYS};
pub use initializer::InitializerHook;
pub use mock::{CallLog, MockDom, MockNode};
pub use plural::{is_plural, pluralize, singular_of};
pub use provider::{Element, ElementRef, PredicateArity, Scope, ScopeRef, SetValue, Surface};
pub use region::{Entity, ManyRegions, Parent, RegionCollection};
pub use result::{PaginaError, PaginaResult};
pub use schema::{Cardinality, Namespace, RegionSpec, Schema, SchemaBuilder, ScopeSpec};

#[cfg(test)]
mod tests {
    use super::*;

    mod element_accessor_tests {
        use super::*;

        #[test]
        fn test_element_accessor_calls_find_once() {
            let dom = MockDom::new(
                MockNode::new("browser")
                    .child(MockNode::new("text_field").attr("id", "name").value("John")),
            );
            let schema = SchemaBuilder::new("Page")
                .text_field("name", Criteria::new().with("id", "name"))
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            let element = page.element("name").unwrap().unwrap();
            assert_eq!(element.tag(), "text_field");
            assert_eq!(dom.log().entries(), vec!["find(text_field, id=\"name\")"]);
        }

        #[test]
        fn test_read_accessor_additionally_reads_value() {
            let dom = MockDom::new(
                MockNode::new("browser")
                    .child(MockNode::new("text_field").attr("id", "name").value("John")),
            );
            let schema = SchemaBuilder::new("Page")
                .text_field("name", Criteria::new().with("id", "name"))
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            assert_eq!(page.read("name").unwrap().as_text(), Some("John"));
            assert_eq!(dom.log().count_matching("find(text_field"), 1);
            assert_eq!(dom.log().count_matching("value(text_field#name"), 1);
        }

        #[test]
        fn test_click_accessor() {
            let button = MockNode::new("button").attr("id", "submit");
            let dom = MockDom::new(MockNode::new("browser").child(button.clone()));
            let schema = SchemaBuilder::new("Page")
                .button("submit", Criteria::new().with("id", "submit"))
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            page.click("submit").unwrap();
            assert_eq!(button.clicks(), 1);
        }

        #[test]
        fn test_checkbox_set_uses_generic_set_not_keystrokes() {
            let agree = MockNode::new("checkbox").attr("name", "agree");
            let dom = MockDom::new(MockNode::new("browser").child(agree.clone()));
            let schema = SchemaBuilder::new("Page")
                .checkbox("agree", Criteria::new().with("name", "agree"))
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            page.set("agree", true).unwrap();
            assert!(agree.is_checked());
            assert_eq!(page.read("agree").unwrap().as_flag(), Some(true));
            assert_eq!(dom.log().count_matching("set("), 1);
            assert_eq!(dom.log().count_matching("send_keys("), 0);
        }

        #[test]
        fn test_set_falls_back_to_keystrokes() {
            let bio = MockNode::new("textarea").attr("id", "bio").without_set();
            let dom = MockDom::new(MockNode::new("browser").child(bio.clone()));
            let schema = SchemaBuilder::new("Page")
                .textarea("bio", Criteria::new().with("id", "bio"))
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            page.set("bio", "hello").unwrap();
            assert_eq!(bio.keys_sent(), vec!["hello"]);
            assert_eq!(dom.log().count_matching("send_keys("), 1);
        }

        #[test]
        fn test_select_accessor_selects_an_option() {
            let country = MockNode::new("select_list")
                .attr("name", "country")
                .options(&["USA", "Russia"])
                .selected("USA");
            let dom = MockDom::new(MockNode::new("browser").child(country.clone()));
            let schema = SchemaBuilder::new("Page")
                .select_list("country", Criteria::new().with("name", "country"))
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            page.set("country", "Russia").unwrap();
            assert_eq!(country.selected_label().as_deref(), Some("Russia"));
            assert_eq!(page.read("country").unwrap().as_text(), Some("Russia"));
            assert_eq!(dom.log().count_matching("select_option("), 1);
        }

        #[test]
        fn test_heading_reads_text() {
            let dom = MockDom::new(
                MockNode::new("browser")
                    .child(MockNode::new("h1").attr("id", "title").text("Welcome")),
            );
            let schema = SchemaBuilder::new("Page")
                .define("title", "h1", Criteria::new().with("id", "title"))
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();
            assert_eq!(page.read("title").unwrap().as_text(), Some("Welcome"));
        }

        #[test]
        fn test_unsupported_operation() {
            let dom = MockDom::new(
                MockNode::new("browser").child(MockNode::new("div").attr("id", "x")),
            );
            let schema = SchemaBuilder::new("Page")
                .div("box", Criteria::new().with("id", "x"))
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            let err = page.click("box").unwrap_err();
            assert!(matches!(
                err,
                PaginaError::UnsupportedAccessor {
                    operation: "click",
                    ..
                }
            ));
        }

        #[test]
        fn test_unknown_element() {
            let dom = MockDom::new(MockNode::new("browser"));
            let schema = SchemaBuilder::new("Page").build();
            let page = Entity::new(schema, dom.scope()).unwrap();
            let err = page.read("nope").unwrap_err();
            assert!(matches!(err, PaginaError::UnknownElement { name } if name == "nope"));
        }

        #[test]
        fn test_provider_timeout_propagates_unmodified() {
            // A native-only lookup that misses yields an absent handle;
            // reading through it surfaces the provider's own timeout.
            let dom = MockDom::new(MockNode::new("browser"));
            let schema = SchemaBuilder::new("Page")
                .text_field("name", Criteria::new().with("id", "name"))
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            let err = page.read("name").unwrap_err();
            assert!(matches!(err, PaginaError::Timeout { ms: 5000 }));
        }

        #[test]
        fn test_resolver_is_reevaluated_per_call() {
            let dom = MockDom::new(
                MockNode::new("browser")
                    .child(MockNode::new("div").attr("id", "special").text("hi")),
            );
            let schema = SchemaBuilder::new("Page")
                .resolver("special", "div", |entity| {
                    entity
                        .scope()
                        .find("div", &Criteria::new().with("id", "special"))
                })
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            let _ = page.element("special").unwrap();
            let _ = page.element("special").unwrap();
            assert_eq!(dom.log().count_matching("find(div"), 2);
        }
    }

    mod predicate_filter_tests {
        use super::*;

        fn country_dom() -> MockDom {
            MockDom::new(
                MockNode::new("browser")
                    .child(
                        MockNode::new("select_list")
                            .attr("id", "shipping")
                            .options(&["USA", "Russia"])
                            .selected("Russia"),
                    )
                    .child(
                        MockNode::new("select_list")
                            .attr("id", "billing")
                            .options(&["USA", "Russia"])
                            .selected("USA"),
                    ),
            )
        }

        #[test]
        fn test_unary_predicate_fetches_collection_and_filters() {
            let dom = country_dom();
            let schema = SchemaBuilder::new("Page")
                .select_list("usa_list", Criteria::new().with("selected", "USA"))
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            let element = page.element("usa_list").unwrap().unwrap();
            assert_eq!(element.selected_option().unwrap(), "USA");
            // The predicate path pluralizes and fetches the collection.
            assert_eq!(dom.log().count_matching("find_all(select_lists"), 1);
            assert_eq!(dom.log().count_matching("find(select_list,"), 0);
        }

        #[test]
        fn test_nullary_predicate_compares_state_flag() {
            let dom = MockDom::new(
                MockNode::new("browser")
                    .child(MockNode::new("checkbox").attr("class", "opt"))
                    .child(MockNode::new("checkbox").attr("class", "opt").checked(true)),
            );
            let schema = SchemaBuilder::new("Page")
                .checkbox("active", Criteria::new().with("class", "opt").with("checked", true))
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            let element = page.element("active").unwrap().unwrap();
            assert!(element.is_on().unwrap());
        }

        #[test]
        fn test_filtered_to_empty_is_absent_not_error() {
            let dom = country_dom();
            let schema = SchemaBuilder::new("Page")
                .select_list("mars_list", Criteria::new().with("selected", "Mars"))
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            assert!(page.element("mars_list").unwrap().is_none());
            let err = page.read("mars_list").unwrap_err();
            assert!(matches!(err, PaginaError::ElementAbsent { .. }));
        }

        #[test]
        fn test_plural_declaration_returns_filtered_collection() {
            let dom = country_dom();
            let schema = SchemaBuilder::new("Page")
                .define(
                    "usa_lists",
                    "select_lists",
                    Criteria::new().with("selected", "USA"),
                )
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            let elements = page.elements("usa_lists").unwrap();
            assert_eq!(elements.len(), 1);
            // Already plural: the declared method is used as-is.
            assert_eq!(dom.log().count_matching("find_all(select_lists"), 1);
        }

        #[test]
        fn test_visible_criterion_is_forwarded_natively() {
            let dom = MockDom::new(
                MockNode::new("browser")
                    .child(MockNode::new("div").attr("class", "note").hidden())
                    .child(MockNode::new("div").attr("class", "note").text("shown")),
            );
            let schema = SchemaBuilder::new("Page")
                .div(
                    "note",
                    Criteria::new().with("class", "note").with("visible", true),
                )
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            assert_eq!(page.read("note").unwrap().as_text(), Some("shown"));
            // Native path: a single find carries both criteria, no
            // collection fetch happens.
            assert_eq!(
                dom.log().count_matching("find(div, class=\"note\", visible=true)"),
                1
            );
            assert_eq!(dom.log().count_matching("find_all("), 0);
        }

        #[test]
        fn test_cannot_pluralize_surfaces_lazily() {
            let surface = Surface::standard()
                .with_method("widget")
                .with_predicate("widget", "armed", PredicateArity::Nullary);
            let dom = MockDom::with_surface(
                MockNode::new("browser").child(MockNode::new("widget")),
                surface.clone(),
            );
            let schema = SchemaBuilder::new("Page")
                .surface(surface)
                .define("arm", "widget", Criteria::new().with("armed", true))
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            let err = page.element("arm").unwrap_err();
            assert!(matches!(err, PaginaError::CannotPluralize { tag } if tag == "widget"));
        }
    }

    mod capability_snapshot_tests {
        use super::*;

        #[test]
        fn test_registry_mutation_applies_to_later_builds_only() {
            let tile = MockNode::new("banner_tile").attr("id", "promo");
            let dom = MockDom::new(MockNode::new("browser").child(tile.clone()));
            let declaration = |name: &str| {
                SchemaBuilder::new(name)
                    .define("promo", "banner_tile", Criteria::new().with("id", "promo"))
                    .build()
            };

            let before = Entity::new(declaration("Before"), dom.scope()).unwrap();
            assert!(matches!(
                before.click("promo").unwrap_err(),
                PaginaError::UnsupportedAccessor { .. }
            ));

            capability::add_clickable("banner_tile");

            // Already-compiled accessors never change retroactively.
            assert!(matches!(
                before.click("promo").unwrap_err(),
                PaginaError::UnsupportedAccessor { .. }
            ));

            let after = Entity::new(declaration("After"), dom.scope()).unwrap();
            after.click("promo").unwrap();
            assert_eq!(tile.clicks(), 1);
        }
    }

    mod page_composition_tests {
        use super::*;

        #[test]
        fn test_login_page_end_to_end() {
            let dom = MockDom::new(
                MockNode::new("browser").child(
                    MockNode::new("div")
                        .attr("id", "login")
                        .child(MockNode::new("text_field").attr("name", "user"))
                        .child(MockNode::new("checkbox").attr("name", "remember"))
                        .child(MockNode::new("button").attr("type", "submit"))
                        .child(
                            MockNode::new("div")
                                .attr("class", "banner")
                                .text("Welcome back"),
                        ),
                ),
            );
            let schema = SchemaBuilder::new("LoginPage")
                .has_one(
                    "form",
                    RegionSpec::new()
                        .within(Criteria::new().with("id", "login"))
                        .inline(|form| {
                            form.text_field("user", Criteria::new().with("name", "user"))
                                .checkbox("remember", Criteria::new().with("name", "remember"))
                                .button("submit", Criteria::new().with("type", "submit"))
                                .div("banner", Criteria::new().with("class", "banner"))
                        }),
                )
                .build();
            let page = Entity::new(schema, dom.scope()).unwrap();

            let form = page.region("form").unwrap();
            form.set("user", "ada").unwrap();
            form.set("remember", true).unwrap();
            form.click("submit").unwrap();
            assert_eq!(form.read("user").unwrap().as_text(), Some("ada"));
            assert_eq!(form.read("remember").unwrap().as_flag(), Some(true));
            assert_eq!(form.read("banner").unwrap().as_text(), Some("Welcome back"));
        }
    }
}
