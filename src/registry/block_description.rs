//! Parser for the `PothosDoc` block-description comment markup (SPEC_FULL.md §6).
//!
//! A block's source file carries a comment block introduced by a `PothosDoc` marker and
//! a series of `|directive` lines. This parser turns that markup into one
//! `BlockDescription` JSON object *per factory* the block declares — matching the donor
//! framework's own `|factory` overload convention, where a single doc block can
//! describe several constructor signatures sharing the rest of the metadata. The block
//! catalog / constructor resolution itself stays external (SPEC_FULL.md §1); this module
//! only owns turning the comment text into structured, queryable records.

use std::collections::HashMap;

use crate::error::{PothosError, Result};

use super::plugin_path::PluginPath;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ParamDescription {
    pub name: String,
    pub label: Option<String>,
    pub default: Option<String>,
    pub preview: Option<String>,
    pub widget: Option<WidgetSpec>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct WidgetSpec {
    pub name: String,
    pub kwargs: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SetterSpec {
    pub method: String,
    pub param: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FactorySpec {
    pub path: String,
    pub arg_types: Vec<String>,
}

/// One factory's full description: the shared block metadata plus that factory's own
/// path/signature. SPEC_FULL.md §6: "The parser emits one JSON object per factory
/// discovered."
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BlockDescription {
    pub category: Option<String>,
    pub keywords: Vec<String>,
    pub aliases: Vec<String>,
    pub params: Vec<ParamDescription>,
    pub mode: Option<String>,
    pub factory: FactorySpec,
    pub setters: Vec<SetterSpec>,
}

fn parse_widget(raw: &str) -> Option<WidgetSpec> {
    let open = raw.find('(')?;
    let close = raw.rfind(')')?;
    if close < open {
        return None;
    }
    let name = raw[..open].trim().to_string();
    let args_str = &raw[open + 1..close];
    let mut kwargs = Vec::new();
    for pair in args_str.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        if let Some((k, v)) = pair.split_once('=') {
            kwargs.push((k.trim().to_string(), v.trim().to_string()));
        }
    }
    Some(WidgetSpec { name, kwargs })
}

fn parse_factory_line(raw: &str) -> Result<(String, Vec<String>)> {
    let open = raw.find('(');
    let (path_part, args_part) = match open {
        Some(idx) => {
            let close = raw
                .rfind(')')
                .ok_or_else(|| PothosError::configuration(format!("malformed |factory line: '{raw}'")))?;
            (&raw[..idx], &raw[idx + 1..close])
        }
        None => (raw, ""),
    };
    // Validate the factory references a syntactically legal plugin path even though
    // resolving it is out of scope.
    PluginPath::parse(path_part.trim())?;
    let arg_types = args_part.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect();
    Ok((path_part.trim().to_string(), arg_types))
}

/// Parse a `PothosDoc` comment block's body (the text between the `PothosDoc` marker
/// line and the comment's close) into one `BlockDescription` per `|factory` directive
/// found. Directive lines are introduced by `|` (leading `*`/`//` comment decoration is
/// stripped first). Unrecognized directives are ignored rather than rejected, matching
/// the donor markup's tolerance for forward-compatible additions.
pub fn parse_doc_block(text: &str) -> Result<Vec<BlockDescription>> {
    let mut category = None;
    let mut keywords = Vec::new();
    let mut aliases = Vec::new();
    let mut mode = None;
    let mut setters = Vec::new();
    let mut factories: Vec<(String, Vec<String>)> = Vec::new();

    let mut params: Vec<ParamDescription> = Vec::new();
    let mut param_index: HashMap<String, usize> = HashMap::new();
    let mut current_param: Option<String> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim().trim_start_matches('*').trim_start_matches("//").trim();
        let Some(rest) = line.strip_prefix('|') else { continue };
        let (directive, arg) = rest.split_once(' ').map(|(a, b)| (a, b.trim())).unwrap_or((rest, ""));

        match directive {
            "category" => category = Some(arg.to_string()),
            "keywords" => keywords.extend(arg.split_whitespace().map(str::to_string)),
            "alias" => aliases.push(arg.to_string()),
            "mode" => mode = Some(arg.trim_matches(|c| c == '{' || c == '}').to_string()),
            "param" => {
                let (name, label) = match arg.find('[') {
                    Some(idx) if arg.ends_with(']') => {
                        (arg[..idx].trim().to_string(), Some(arg[idx + 1..arg.len() - 1].to_string()))
                    }
                    _ => (arg.to_string(), None),
                };
                param_index.insert(name.clone(), params.len());
                current_param = Some(name.clone());
                params.push(ParamDescription { name, label, default: None, preview: None, widget: None });
            }
            "default" => {
                if let Some(name) = &current_param {
                    if let Some(&idx) = param_index.get(name) {
                        params[idx].default = Some(arg.to_string());
                    }
                }
            }
            "preview" => {
                if let Some(name) = &current_param {
                    if let Some(&idx) = param_index.get(name) {
                        params[idx].preview = Some(arg.trim_matches(|c| c == '{' || c == '}').to_string());
                    }
                }
            }
            "widget" => {
                if let Some(name) = &current_param {
                    if let Some(&idx) = param_index.get(name) {
                        params[idx].widget = parse_widget(arg);
                    }
                }
            }
            "setter" => {
                if let Some(open) = arg.find('(') {
                    if let Some(close) = arg.rfind(')') {
                        let method = arg[..open].trim().to_string();
                        let param = arg[open + 1..close].trim().to_string();
                        setters.push(SetterSpec { method, param });
                    }
                }
            }
            "factory" => factories.push(parse_factory_line(arg)?),
            _ => {}
        }
    }

    if factories.is_empty() {
        return Err(PothosError::configuration("PothosDoc block declares no |factory directive"));
    }

    Ok(factories
        .into_iter()
        .map(|(path, arg_types)| BlockDescription {
            category: category.clone(),
            keywords: keywords.clone(),
            aliases: aliases.clone(),
            params: params.clone(),
            mode: mode.clone(),
            factory: FactorySpec { path, arg_types },
            setters: setters.clone(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        PothosDoc Differential Decoder
        |category /Digital/Decoders
        |keywords differential encoding nrz
        |alias /blocks/diff_decoder
        |param Symbols[Num Symbols]
        |default 2
        |widget SpinBox(minimum=2)
        |factory /blocks/diff_decoder(symbols)
        |setter setSymbols(symbols)
        |mode {graphWidget}
    "#;

    #[test]
    fn parses_single_factory_block() {
        let descs = parse_doc_block(SAMPLE).unwrap();
        assert_eq!(descs.len(), 1);
        let d = &descs[0];
        assert_eq!(d.category.as_deref(), Some("/Digital/Decoders"));
        assert_eq!(d.keywords, vec!["differential", "encoding", "nrz"]);
        assert_eq!(d.aliases, vec!["/blocks/diff_decoder"]);
        assert_eq!(d.params.len(), 1);
        assert_eq!(d.params[0].name, "Symbols");
        assert_eq!(d.params[0].label.as_deref(), Some("Num Symbols"));
        assert_eq!(d.params[0].default.as_deref(), Some("2"));
        assert_eq!(d.params[0].widget.as_ref().unwrap().name, "SpinBox");
        assert_eq!(d.factory.path, "/blocks/diff_decoder");
        assert_eq!(d.factory.arg_types, vec!["symbols"]);
        assert_eq!(d.setters[0].method, "setSymbols");
        assert_eq!(d.mode.as_deref(), Some("graphWidget"));
    }

    #[test]
    fn multiple_factory_lines_each_get_their_own_record() {
        let text = "PothosDoc X\n|factory /a/b()\n|factory /a/c(n)\n";
        let descs = parse_doc_block(text).unwrap();
        assert_eq!(descs.len(), 2);
        assert_eq!(descs[0].factory.path, "/a/b");
        assert_eq!(descs[1].factory.path, "/a/c");
    }

    #[test]
    fn rejects_block_with_no_factory() {
        assert!(parse_doc_block("PothosDoc X\n|category /Foo\n").is_err());
    }
}
