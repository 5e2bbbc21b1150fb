//! Property-based tests for the rendering pipeline.

// Property tests use expect/unwrap/panic for simplicity
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use proptest::prelude::*;
use stencil::render::Renderer;
use stencil::template::Mode;
use stencil::value::{Format, decode};
use stencil::{Error, Value};

proptest! {
    /// A template without actions renders byte-identical to its source,
    /// against any variables.
    #[test]
    fn prop_literal_round_trip(source in r"[a-zA-Z0-9 \t\n.,:;!?<>&'()\[\]-]{0,200}") {
        let root = decode(br#"{"anything":[1,2,3]}"#, Format::Json).unwrap();
        let got = Renderer::new(Mode::Text).render(&source, &root).unwrap();
        prop_assert_eq!(got, source);
    }

    /// Any path into an empty mapping fails with a missing-key error; it
    /// never silently substitutes empty content.
    #[test]
    fn prop_strict_key_lookup(key in "[a-z][a-z0-9_]{0,12}") {
        let root = decode(b"{}", Format::Json).unwrap();
        let template = format!("{{{{.{key}}}}}");
        let err = Renderer::new(Mode::Text).render(&template, &root).unwrap_err();
        prop_assert!(matches!(err, Error::MissingKey { .. }), "expected MissingKey error");
    }

    /// Escaped output never contains a raw `<` or `>` from a substituted
    /// value.
    #[test]
    fn prop_html_mode_never_leaks_angle_brackets(s in r"[a-z<>&\x22']{0,60}") {
        let root = Value::from(s.as_str());
        let got = Renderer::new(Mode::Html).render("{{.}}", &root).unwrap();
        prop_assert!(!got.contains('<'));
        prop_assert!(!got.contains('>'));
    }

    /// Integer round-trip through each decoder yields the same rendering.
    #[test]
    fn prop_integer_equivalence(n in -1_000_000i64..1_000_000i64) {
        let json = decode(format!("{{\"x\": {n}}}").as_bytes(), Format::Json).unwrap();
        let yaml = decode(format!("x: {n}\n").as_bytes(), Format::Yaml).unwrap();
        let toml = decode(format!("x = {n}\n").as_bytes(), Format::Toml).unwrap();
        prop_assert_eq!(&json, &yaml);
        prop_assert_eq!(&yaml, &toml);

        let renderer = Renderer::new(Mode::Text);
        prop_assert_eq!(renderer.render("{{.x}}", &json).unwrap(), n.to_string());
    }
}
