//! Parse archive markup into `Element` trees.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::archive::element::{Element, unescape};
use crate::errors::{ArchiveError, SourceContext};

#[derive(Parser)]
#[grammar = "archive.pest"]
struct ArchiveParser;

/// Parse one document's markup. `name` labels the source in diagnostics
/// (a filename, or "<input>" for in-memory bytes).
pub fn parse_document(name: &str, source: &str) -> Result<Element, ArchiveError> {
    let ctx = SourceContext::new(name, source);
    let mut pairs = ArchiveParser::parse(Rule::document, source)
        .map_err(|e| pest_error(&ctx, e))?;
    let document = pairs.next().expect("document rule always yields one pair");
    let element = document
        .into_inner()
        .find(|p| p.as_rule() == Rule::element)
        .expect("document rule contains an element");
    build_element(&ctx, element)
}

fn build_element(ctx: &SourceContext, pair: Pair<Rule>) -> Result<Element, ArchiveError> {
    let inner = pair.into_inner().next().expect("element has one form");
    match inner.as_rule() {
        Rule::self_closing => {
            let mut parts = inner.into_inner();
            let name = parts.next().expect("tag name").as_str().to_string();
            let mut element = Element::new(name);
            for part in parts {
                read_attribute(&mut element, part);
            }
            Ok(element)
        }
        Rule::container => {
            let mut element = Element::new(String::new());
            let mut text = String::new();
            for part in inner.into_inner() {
                match part.as_rule() {
                    Rule::name => element.name = part.as_str().to_string(),
                    Rule::attribute => read_attribute(&mut element, part),
                    Rule::element => element.push(build_element(ctx, part)?),
                    Rule::text => text.push_str(part.as_str()),
                    Rule::close_tag => {
                        let close = part
                            .clone()
                            .into_inner()
                            .next()
                            .expect("close tag has a name");
                        if close.as_str() != element.name {
                            let span = part.as_span();
                            return Err(ArchiveError::Parse {
                                src: ctx.named_source(),
                                span: (span.start(), span.end() - span.start()).into(),
                                message: format!(
                                    "closing tag </{}> does not match <{}>",
                                    close.as_str(),
                                    element.name
                                ),
                            });
                        }
                    }
                    _ => {}
                }
            }
            element.text = unescape(text.trim());
            Ok(element)
        }
        other => unreachable!("unexpected rule inside element: {other:?}"),
    }
}

fn read_attribute(element: &mut Element, pair: Pair<Rule>) {
    let mut parts = pair.into_inner();
    let key = parts.next().expect("attribute name").as_str().to_string();
    let value = parts
        .next()
        .expect("quoted value")
        .into_inner()
        .next()
        .expect("attribute value")
        .as_str();
    element.attrs.push((key, unescape(value)));
}

fn pest_error(ctx: &SourceContext, e: pest::error::Error<Rule>) -> ArchiveError {
    let span = match e.location {
        pest::error::InputLocation::Pos(p) => (p, 0),
        pest::error::InputLocation::Span((s, end)) => (s, end - s),
    };
    let message = match &e.variant {
        pest::error::ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
            format!("expected one of {positives:?}")
        }
        other => other.message().to_string(),
    };
    ArchiveError::Parse {
        src: ctx.named_source(),
        span: span.into(),
        message,
    }
}
