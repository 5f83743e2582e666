//! # Generated Modules
//!
//! Turns one schema document into the text of its TypeScript module, and a
//! directory listing into the text of its `index.ts`.
//!
//! [`compile_document`] is the per-file unit of work. It depends only on the
//! document and a [`ResolveRef`] implementation, so files can be compiled in
//! any order (or in isolation in tests) with the same result.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::node::{RootSchema, TEMPLATES_KEY};
use crate::reference::{dereference, ResolveRef};
use crate::source::SchemaName;
use crate::zod;

/// Extension of generated files, without the dot.
pub const MODULE_EXTENSION: &str = "ts";

/// File name of the per-directory re-export index.
pub const INDEX_FILE: &str = "index.ts";

/// Import line heading every generated module.
const ZOD_IMPORT: &str = r#"import { z } from "zod";"#;

/// One generated validator module.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedModule {
    /// Exported validator name (the schema's base name).
    pub name: SchemaName,
    /// zod expression of the validator.
    pub expression: String,
    /// Templates side-channel value, exported verbatim when present.
    pub templates: Option<Value>,
}

impl GeneratedModule {
    /// File name of the module, e.g. `PaginatedRequest.ts`.
    pub fn file_name(&self) -> String {
        format!("{}.{MODULE_EXTENSION}", self.name)
    }

    /// Name of the templates constant, e.g. `SymbolResponseTemplates`.
    pub fn templates_name(&self) -> String {
        format!("{}Templates", self.name)
    }

    /// Full module source, newline terminated.
    pub fn render(&self) -> String {
        let mut out = format!(
            "{ZOD_IMPORT}\n\nexport const {} = {};",
            self.name, self.expression
        );
        if let Some(templates) = &self.templates {
            let mut object = Map::new();
            object.insert(TEMPLATES_KEY.to_string(), zod::js_value(templates));
            // Serializing a `Map` of `Value`s cannot fail.
            let pretty = serde_json::to_string_pretty(&object).unwrap_or_default();
            out.push_str(&format!(
                "\n\nexport const {} = {pretty} as const;",
                self.templates_name()
            ));
        }
        out.push('\n');
        out
    }
}

/// Compile the document keyed `document` (raw JSON `value`) into a module
/// exported as `name`.
///
/// # Errors
///
/// Returns `CompileError::Reference` if a `$ref` cannot be inlined and
/// `CompileError::Unsupported` if the schema cannot be expressed in zod.
pub fn compile_document(
    name: &SchemaName,
    document: &str,
    value: &Value,
    resolver: &impl ResolveRef,
) -> Result<GeneratedModule> {
    let dereferenced = dereference(document, value, resolver)?;
    compile_dereferenced(name, document, &dereferenced)
}

/// Compile a document whose references were already inlined.
pub(crate) fn compile_dereferenced(
    name: &SchemaName,
    document: &str,
    dereferenced: &Value,
) -> Result<GeneratedModule> {
    let root = RootSchema::from_value(document, dereferenced)?;
    Ok(GeneratedModule {
        name: name.clone(),
        expression: zod::expression(&root.node),
        templates: root.templates,
    })
}

/// Render the re-export index for a directory's modules, sorted by name.
pub fn render_index<'a>(names: impl IntoIterator<Item = &'a SchemaName>) -> String {
    let mut names: Vec<&SchemaName> = names.into_iter().collect();
    names.sort();
    names.dedup();
    let lines: Vec<String> = names
        .iter()
        .map(|name| format!("export * from \"./{name}\";"))
        .collect();
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SchemaRegistry;
    use serde_json::json;
    use std::path::Path;

    fn name(s: &str) -> SchemaName {
        SchemaName::parse(s, Path::new("test.json")).unwrap()
    }

    #[test]
    fn render_without_templates() {
        let module = GeneratedModule {
            name: name("CompletionItem"),
            expression: r#"z.object({ "label": z.string() })"#.to_string(),
            templates: None,
        };
        assert_eq!(module.file_name(), "CompletionItem.ts");
        assert_eq!(
            module.render(),
            "import { z } from \"zod\";\n\nexport const CompletionItem = z.object({ \"label\": z.string() });\n"
        );
    }

    #[test]
    fn symbol_response_matches_reference_output() {
        let doc = json!({
            "properties": {
                "file_path": {"title": "File Path", "type": "string"},
                "symbol_path": {"items": {"type": "string"}, "title": "Symbol Path", "type": "array"},
                "symbol_content": {"title": "Symbol Content", "type": "string"}
            },
            "required": ["file_path", "symbol_path", "symbol_content"],
            "title": "SymbolResponse",
            "type": "object",
            "markdown": "### Symbol: `{{ symbol_path | join('.') }}` in `{{ file_path }}`\n\n```python\n{{ symbol_content }}\n```"
        });
        let mut registry = SchemaRegistry::default();
        registry.insert("symbol/SymbolResponse.json", doc.clone());

        let module =
            compile_document(&name("SymbolResponse"), "symbol/SymbolResponse.json", &doc, &registry)
                .unwrap();
        let expected = r####"import { z } from "zod";

export const SymbolResponse = z.object({ "file_path": z.string(), "symbol_path": z.array(z.string()), "symbol_content": z.string() });

export const SymbolResponseTemplates = {
  "markdown": "### Symbol: `{{ symbol_path | join('.') }}` in `{{ file_path }}`\n\n```python\n{{ symbol_content }}\n```"
} as const;
"####;
        assert_eq!(module.render(), expected);
    }

    #[test]
    fn templates_name_and_value_passthrough() {
        let doc = json!({"type": "object", "properties": {}, "markdown": {"text": "x", "extra": [1, 2]}});
        let registry = SchemaRegistry::default();
        let module = compile_document(&name("Hover"), "Hover.json", &doc, &registry).unwrap();
        assert_eq!(module.templates_name(), "HoverTemplates");
        assert_eq!(module.templates, Some(json!({"text": "x", "extra": [1, 2]})));
    }

    #[test]
    fn index_is_sorted_and_newline_terminated() {
        let names = [name("Range"), name("LocateRequest"), name("Position")];
        assert_eq!(
            render_index(&names),
            "export * from \"./LocateRequest\";\nexport * from \"./Position\";\nexport * from \"./Range\";\n"
        );
    }

    #[test]
    fn sorting_is_bytewise_lexicographic() {
        let names = [name("abc"), name("Zed"), name("_x")];
        assert_eq!(
            render_index(&names),
            "export * from \"./Zed\";\nexport * from \"./_x\";\nexport * from \"./abc\";\n"
        );
    }

    #[test]
    fn templates_numbers_print_like_expression_numbers() {
        let module = GeneratedModule {
            name: name("Outline"),
            expression: "z.number().int().default(2)".to_string(),
            templates: Some(json!({"max_depth": 2.0, "scale": 1.5})),
        };
        let text = module.render();
        assert!(text.contains("\"max_depth\": 2,\n"), "{text}");
        assert!(text.contains("\"scale\": 1.5\n"), "{text}");
        assert!(!text.contains("2.0"), "{text}");
    }
}
