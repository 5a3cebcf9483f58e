//! Built-in XPath 1.0 evaluator. The body must be well-formed XML or XHTML.

use sxd_document::parser;
use sxd_xpath::{Context, Factory, Value};

use super::{EvalError, XPathEvaluator, XPathValue};

#[derive(Debug, Clone, Copy, Default)]
pub struct XPath;

impl XPathEvaluator for XPath {
    fn evaluate(&self, expr: &str, document: &str) -> Result<XPathValue, EvalError> {
        let package = parser::parse(document).map_err(|e| {
            tracing::debug!("xml parse failed: {e:?}");
            EvalError::InvalidDocument("body is not well-formed xml".to_string())
        })?;
        let document = package.as_document();

        let xpath = Factory::new()
            .build(expr)
            .ok()
            .flatten()
            .ok_or_else(|| EvalError::InvalidExpression(expr.to_string()))?;
        let value = xpath
            .evaluate(&Context::new(), document.root())
            .map_err(|e| {
                tracing::debug!("xpath {expr} failed: {e:?}");
                EvalError::InvalidExpression(expr.to_string())
            })?;

        Ok(match value {
            Value::Boolean(b) => XPathValue::Boolean(b),
            Value::Number(n) => XPathValue::Number(n),
            Value::String(s) => XPathValue::String(s),
            Value::Nodeset(nodes) => XPathValue::NodeSet(nodes.size()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "<feed><title>news</title><item id=\"1\"/><item id=\"2\"/></feed>";

    fn eval(expr: &str, document: &str) -> Result<XPathValue, EvalError> {
        XPath.evaluate(expr, document)
    }

    #[test]
    fn evaluate_should_count_matching_nodes() {
        assert_eq!(eval("//item", FEED), Ok(XPathValue::NodeSet(2)));
        assert_eq!(eval("count(//item)", FEED), Ok(XPathValue::Number(2.0)));
    }

    #[test]
    fn evaluate_should_return_strings_and_booleans() {
        assert_eq!(eval("string(//title)", FEED), Ok(XPathValue::String("news".to_string())));
        assert_eq!(eval("string(//item[2]/@id)", FEED), Ok(XPathValue::String("2".to_string())));
        assert_eq!(eval("boolean(//item)", FEED), Ok(XPathValue::Boolean(true)));
        assert_eq!(eval("boolean(//missing)", FEED), Ok(XPathValue::Boolean(false)));
    }

    #[test]
    fn evaluate_should_find_nothing_as_empty_node_set() {
        assert_eq!(eval("//missing", FEED), Ok(XPathValue::NodeSet(0)));
    }

    #[test]
    fn evaluate_should_reject_malformed_document() {
        assert!(matches!(
            eval("//item", "<feed><item></feed>"),
            Err(EvalError::InvalidDocument(_))
        ));
    }

    #[test]
    fn evaluate_should_reject_malformed_expression() {
        assert_eq!(
            eval("//item[", FEED),
            Err(EvalError::InvalidExpression("//item[".to_string()))
        );
    }
}
