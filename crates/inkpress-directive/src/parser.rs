//! Directive parser.
//!
//! Each directive instance is read by [`parse_directive`], which takes the
//! remaining token slice and hands back the finished [`Configuration`] with
//! whatever tokens follow it. Sub-options are applied one at a time by
//! [`apply_option`].

use std::path::{Component, Path, PathBuf};

use crate::config::{Configuration, DEFAULT_STATIC_DIR, DEFAULT_TEMPLATE};
use crate::error::{ParseError, ParseErrorKind, PartialParse};
use crate::lexer::{tokenize_prefix, Token};

/// Inputs that shape how directive text is read.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Name of the top-level directive (e.g. `mmark`)
    pub directive: String,

    /// Document root that template and sitegen paths are joined to
    pub root: PathBuf,

    /// File name used in error messages
    pub file: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            directive: "mmark".to_string(),
            root: PathBuf::from("."),
            file: None,
        }
    }
}

/// Parse directive text into one configuration per directive instance.
///
/// On failure the configurations parsed before the offending directive are
/// returned inside the error.
pub fn parse(source: &str, options: &ParseOptions) -> Result<Vec<Configuration>, PartialParse> {
    let file = options.file.as_deref();

    // Directives ahead of a lexical error still count.
    let (tokens, lex_error) = tokenize_prefix(source);

    let mut parsed = Vec::new();
    let mut rest = tokens.as_slice();

    while !rest.is_empty() {
        match parse_directive(rest, options) {
            Ok((config, remaining)) => {
                let consumed = &rest[..rest.len() - remaining.len()];
                if let Some(lex_error) = &lex_error {
                    if remaining.is_empty() && !ends_before(consumed, lex_error) {
                        break;
                    }
                }

                tracing::debug!(
                    "Parsed {} scope {}",
                    options.directive,
                    config.path_scope
                );
                parsed.push(config);
                rest = remaining;
            }
            Err(error) => {
                let error = match lex_error {
                    Some(lex_error) if truncated_by(&error, &lex_error) => lex_error,
                    _ => error,
                };
                return Err(PartialParse {
                    parsed,
                    error: error.in_file(file),
                });
            }
        }
    }

    match lex_error {
        Some(error) => Err(PartialParse {
            parsed,
            error: error.in_file(file),
        }),
        None => Ok(parsed),
    }
}

/// Whether a directive made of `consumed` is complete before `error`.
///
/// A block ends at its `}`; a bare directive ends with its line.
fn ends_before(consumed: &[Token], error: &ParseError) -> bool {
    consumed
        .last()
        .is_some_and(|last| last.is_close() || last.line < error.line)
}

/// Whether `error` comes from tokens cut short by the lexical error `lex`.
fn truncated_by(error: &ParseError, lex: &ParseError) -> bool {
    error.kind == ParseErrorKind::UnclosedBlock || error.line == lex.line
}

/// Parse a single directive instance from the front of `tokens`.
pub fn parse_directive<'t>(
    tokens: &'t [Token],
    options: &ParseOptions,
) -> Result<(Configuration, &'t [Token]), ParseError> {
    let Some((name, rest)) = tokens.split_first() else {
        return Err(ParseError::new(
            ParseErrorKind::MissingDirective(options.directive.clone()),
            1,
            1,
        ));
    };

    if name.quoted || name.text != options.directive {
        return Err(ParseError::at(
            name,
            ParseErrorKind::UnexpectedToken {
                found: name.text.clone(),
                expected: options.directive.clone(),
            },
        ));
    }

    let (args, mut rest) = line_args(name, rest);
    let scope = match args {
        [] => "/".to_string(),
        [scope] => scope.text.clone(),
        [_, extra, ..] => return Err(argument_count(name, extra)),
    };

    let mut config = Configuration::new(options.root.clone(), scope);

    if let Some((open, after)) = rest.split_first() {
        if open.is_open() && open.line == name.line {
            rest = parse_block(&mut config, open, after, options)?;
        }
    }

    config.finish();

    Ok((config, rest))
}

/// Read the options of a `{ ... }` block, returning the tokens after `}`.
fn parse_block<'t>(
    config: &mut Configuration,
    open: &Token,
    mut rest: &'t [Token],
    options: &ParseOptions,
) -> Result<&'t [Token], ParseError> {
    loop {
        let Some((keyword, after)) = rest.split_first() else {
            return Err(ParseError::at(open, ParseErrorKind::UnclosedBlock));
        };

        if keyword.is_close() {
            return Ok(after);
        }
        if keyword.is_open() {
            return Err(ParseError::at(keyword, ParseErrorKind::NestedBlock));
        }

        let (args, remaining) = line_args(keyword, after);
        apply_option(config, keyword, args, options)?;
        rest = remaining;
    }
}

/// Split off the tokens that follow `head` on its line.
///
/// Stops at a structural brace so one-line blocks work.
fn line_args<'t>(head: &Token, rest: &'t [Token]) -> (&'t [Token], &'t [Token]) {
    let count = rest
        .iter()
        .take_while(|t| t.line == head.line && !t.is_open() && !t.is_close())
        .count();
    rest.split_at(count)
}

/// Apply one sub-option and its arguments to `config`.
pub fn apply_option(
    config: &mut Configuration,
    keyword: &Token,
    args: &[Token],
    options: &ParseOptions,
) -> Result<(), ParseError> {
    match keyword.text.as_str() {
        "ext" => {
            if args.is_empty() {
                return Err(argument_count(keyword, keyword));
            }
            config
                .extensions
                .extend(args.iter().map(|t| t.text.clone()));
        }
        "css" => config.styles.push(single_arg(keyword, args)?),
        "js" => config.scripts.push(single_arg(keyword, args)?),
        "template" => match args {
            [file] => {
                if config.templates.contains_key(DEFAULT_TEMPLATE) {
                    return Err(ParseError::at(
                        keyword,
                        ParseErrorKind::DuplicateDefaultTemplate,
                    ));
                }
                config.templates.insert(
                    DEFAULT_TEMPLATE.to_string(),
                    slash_path(&root_join(&options.root, &file.text)),
                );
            }
            [alias, file] => {
                config.templates.insert(
                    alias.text.clone(),
                    slash_path(&root_join(&options.root, &file.text)),
                );
            }
            [] => return Err(argument_count(keyword, keyword)),
            [_, _, extra, ..] => return Err(argument_count(keyword, extra)),
        },
        "sitegen" => {
            let dir = match args {
                [] => DEFAULT_STATIC_DIR,
                [dir] => dir.text.as_str(),
                [_, extra, ..] => return Err(argument_count(keyword, extra)),
            };
            config.static_dir = Some(root_join(&options.root, dir));
        }
        "dev" => {
            config.development = match args {
                [] => true,
                [value] => value.text.eq_ignore_ascii_case("true"),
                [_, extra, ..] => return Err(argument_count(keyword, extra)),
            };
        }
        other => {
            return Err(ParseError::at(
                keyword,
                ParseErrorKind::UnknownOption {
                    directive: options.directive.clone(),
                    option: other.to_string(),
                },
            ))
        }
    }

    Ok(())
}

fn single_arg(keyword: &Token, args: &[Token]) -> Result<String, ParseError> {
    match args {
        [value] => Ok(value.text.clone()),
        [] => Err(argument_count(keyword, keyword)),
        [_, extra, ..] => Err(argument_count(keyword, extra)),
    }
}

fn argument_count(keyword: &Token, at: &Token) -> ParseError {
    ParseError::at(at, ParseErrorKind::ArgumentCount(keyword.text.clone()))
}

/// Join `relative` under `root`, even when it starts with a separator.
fn root_join(root: &Path, relative: &str) -> PathBuf {
    clean(&root.join(relative.trim_start_matches(['/', '\\'])))
}

/// Lexically normalize a path, resolving `.` and `..` components.
fn clean(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
