//! Tests for the field classifier.

use super::*;

fn container(children: Vec<ScreenNode>) -> ScreenNode {
    ScreenNode {
        kind: NodeKind::Other,
        bounds: Rect::new(0.0, 0.0, 1080.0, 1920.0),
        children,
        ..Default::default()
    }
}

/// Editable field at (`left`, `top`), 600x100.
fn input(id: &str, left: f32, top: f32) -> ScreenNode {
    ScreenNode {
        handle: Some(FieldHandle::new(id)),
        kind: NodeKind::Editable,
        bounds: Rect::new(left, top, 600.0, 100.0),
        ..Default::default()
    }
}

fn input_with_hints(id: &str, top: f32, hints: FieldHints) -> ScreenNode {
    ScreenNode {
        hints,
        ..input(id, 100.0, top)
    }
}

/// Label at (`left`, `top`), 300x60.
fn label(text: &str, left: f32, top: f32) -> ScreenNode {
    ScreenNode {
        handle: Some(FieldHandle::new(format!("label-{}", text))),
        kind: NodeKind::Label,
        bounds: Rect::new(left, top, 300.0, 60.0),
        text: Some(text.to_string()),
        ..Default::default()
    }
}

fn handle(id: &str) -> Option<FieldHandle> {
    Some(FieldHandle::new(id))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Abort cases
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_no_editable_fields_is_empty() {
    let tree = container(vec![label("Welcome", 0.0, 0.0)]);
    let result = classify(&tree, None);
    assert!(result.is_empty());
}

#[test]
fn test_single_unhinted_field_is_empty() {
    let tree = container(vec![input("only", 100.0, 400.0)]);
    let result = classify(&tree, Some("example.com"));
    assert!(result.is_empty());
}

#[test]
fn test_three_unhinted_fields_is_empty() {
    let tree = container(vec![
        input("a", 100.0, 200.0),
        input("b", 100.0, 400.0),
        input("c", 100.0, 600.0),
    ]);
    assert!(classify(&tree, None).is_empty());
}

#[test]
fn test_editable_without_handle_is_ignored() {
    let mut anonymous = input("x", 100.0, 200.0);
    anonymous.handle = None;
    let tree = container(vec![anonymous, input("b", 100.0, 400.0)]);

    // Only one usable input, so the two-field fallback does not apply.
    assert!(classify(&tree, None).is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════════
// Two-field fallback
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_two_unhinted_fields_upper_is_username() {
    // Lower field comes first in traversal order on purpose.
    let tree = container(vec![input("lower", 100.0, 700.0), input("upper", 100.0, 300.0)]);
    let result = classify(&tree, None);

    assert_eq!(result.username, handle("upper"));
    assert_eq!(result.password, handle("lower"));
}

#[test]
fn test_two_fields_nested_in_containers() {
    let tree = container(vec![
        container(vec![input("first", 100.0, 300.0)]),
        container(vec![container(vec![input("second", 100.0, 500.0)])]),
    ]);
    let result = classify(&tree, None);

    assert_eq!(result.username, handle("first"));
    assert_eq!(result.password, handle("second"));
}

#[test]
fn test_fallback_skipped_when_one_target_resolved() {
    let tree = container(vec![
        input("plain", 100.0, 300.0),
        input_with_hints(
            "pw",
            500.0,
            FieldHints {
                autofill_hints: vec![AutofillHint::Password],
                ..Default::default()
            },
        ),
    ]);
    let result = classify(&tree, None);

    assert_eq!(result.username, None);
    assert_eq!(result.password, handle("pw"));
    assert!(!result.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════════
// Hint priority
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_semantic_hints() {
    let tree = container(vec![
        input_with_hints(
            "mail",
            300.0,
            FieldHints {
                autofill_hints: vec![AutofillHint::EmailAddress],
                ..Default::default()
            },
        ),
        input_with_hints(
            "secret",
            500.0,
            FieldHints {
                autofill_hints: vec![AutofillHint::Password],
                ..Default::default()
            },
        ),
    ]);
    let result = classify(&tree, None);

    assert_eq!(result.username, handle("mail"));
    assert_eq!(result.password, handle("secret"));
}

#[test]
fn test_resource_id_and_hint_text() {
    let tree = container(vec![
        input_with_hints(
            "f1",
            300.0,
            FieldHints {
                resource_id: Some("login_UserName_input".to_string()),
                ..Default::default()
            },
        ),
        input_with_hints(
            "f2",
            500.0,
            FieldHints {
                hint_text: Some("Enter Password".to_string()),
                ..Default::default()
            },
        ),
    ]);
    let result = classify(&tree, None);

    assert_eq!(result.username, handle("f1"));
    assert_eq!(result.password, handle("f2"));
}

#[test]
fn test_input_type_variations() {
    use input_type::*;

    let tree = container(vec![
        input_with_hints(
            "f1",
            300.0,
            FieldHints {
                input_type: TYPE_CLASS_TEXT | TYPE_TEXT_VARIATION_EMAIL_ADDRESS,
                ..Default::default()
            },
        ),
        input_with_hints(
            "f2",
            500.0,
            FieldHints {
                input_type: TYPE_CLASS_TEXT | TYPE_TEXT_VARIATION_PASSWORD,
                ..Default::default()
            },
        ),
    ]);
    let result = classify(&tree, None);

    assert_eq!(result.username, handle("f1"));
    assert_eq!(result.password, handle("f2"));
}

#[test]
fn test_password_variation_on_non_text_class_is_ignored() {
    // Class 2 is numeric; a PIN pad should not be taken for a password by bits alone.
    let numeric_password = 0x0000_0002 | input_type::TYPE_TEXT_VARIATION_PASSWORD;
    let tree = container(vec![input_with_hints(
        "pin",
        300.0,
        FieldHints {
            input_type: numeric_password,
            ..Default::default()
        },
    )]);

    assert!(classify(&tree, None).is_empty());
}

#[test]
fn test_first_match_wins_per_target() {
    let pw = || FieldHints {
        autofill_hints: vec![AutofillHint::Password],
        ..Default::default()
    };
    let tree = container(vec![
        input_with_hints("pw1", 300.0, pw()),
        input_with_hints("pw2", 500.0, pw()),
    ]);
    let result = classify(&tree, None);

    assert_eq!(result.password, handle("pw1"));
    assert_eq!(result.username, None);
}

#[test]
fn test_single_field_may_take_both_roles() {
    // "user_password" matches both heuristics; the ambiguity is preserved.
    let tree = container(vec![input_with_hints(
        "combo",
        300.0,
        FieldHints {
            resource_id: Some("user_password".to_string()),
            ..Default::default()
        },
    )]);
    let result = classify(&tree, None);

    assert_eq!(result.username, handle("combo"));
    assert_eq!(result.password, handle("combo"));
}

// ═══════════════════════════════════════════════════════════════════════════════
// Nearest label
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_labels_above_fields() {
    let tree = container(vec![
        label("Email", 100.0, 200.0),
        input("a", 100.0, 280.0),
        label("Password", 100.0, 420.0),
        input("b", 100.0, 500.0),
        // A third input keeps the two-field fallback out of the picture.
        input("c", 100.0, 900.0),
    ]);
    let result = classify(&tree, None);

    assert_eq!(result.username, handle("a"));
    assert_eq!(result.password, handle("b"));
}

#[test]
fn test_label_below_and_right_is_not_a_candidate() {
    let tree = container(vec![
        input("field", 100.0, 200.0),
        // Center is right of and below `field`, but above `other`.
        label("Password", 800.0, 600.0),
        input("other", 100.0, 1000.0),
        input("third", 100.0, 1200.0),
    ]);
    let result = classify(&tree, None);

    assert_eq!(result.password, handle("other"));
    assert_eq!(result.username, None);
}

#[test]
fn test_closest_label_is_chosen() {
    let tree = container(vec![
        label("Username", 100.0, 100.0),
        label("Password", 100.0, 700.0),
        input("pw", 100.0, 780.0),
        input("x", 100.0, 1100.0),
        input("y", 100.0, 1300.0),
    ]);
    let result = classify(&tree, None);

    // The "Password" label is nearer to `pw` than the "Username" label.
    assert_eq!(result.password, handle("pw"));
    // `x` and `y` are nearest to "Password" too, never to "Username".
    assert_eq!(result.username, None);
}

#[test]
fn test_deserializes_host_tree() {
    let json = r#"{
        "kind": "other",
        "children": [
            {"handle": "u", "kind": "editable", "bounds": {"top": 10, "left": 0, "width": 100, "height": 20},
             "hints": {"autofillHints": ["username", "somethingNew"]}},
            {"handle": "p", "kind": "editable", "bounds": {"top": 50, "left": 0, "width": 100, "height": 20},
             "hints": {"inputType": 129}}
        ]
    }"#;
    let tree: ScreenNode = serde_json::from_str(json).unwrap();
    let result = classify(&tree, None);

    assert_eq!(result.username, handle("u"));
    assert_eq!(result.password, handle("p"));
}

#[test]
fn test_classify_json() {
    let input = r#"{
        "screen": {"children": [
            {"handle": "a", "kind": "editable", "bounds": {"top": 0, "left": 0, "width": 10, "height": 10}},
            {"handle": "b", "kind": "editable", "bounds": {"top": 40, "left": 0, "width": 10, "height": 10}}
        ]},
        "siteDomain": "example.com"
    }"#;
    let output = classify_json(input).unwrap();
    let result: ClassificationResult = serde_json::from_str(&output).unwrap();

    assert_eq!(result.username, handle("a"));
    assert_eq!(result.password, handle("b"));
    assert!(classify_json("not json").is_err());

    let without_site = input.replace(r#",
        "siteDomain": "example.com""#, "");
    assert!(!without_site.contains("siteDomain"));
    assert_eq!(classify_json(&without_site).unwrap(), output);
}
