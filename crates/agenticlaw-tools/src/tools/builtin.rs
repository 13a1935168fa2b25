//! Builtin tools that need no backend or LLM call: pure computation over
//! their own arguments. All three are in the auto-approve set — see the
//! evaluator's risk classification.

use crate::registry::{Tool, ToolResult};
use agenticlaw_core::{ParamSpec, ParamType, ToolCategory, ToolDescriptor};
use serde_json::Value;

fn string_param(name: &str, description: &str, required: bool) -> ParamSpec {
    ParamSpec {
        name: name.to_string(),
        param_type: ParamType::String,
        required,
        default: None,
        r#enum: None,
        description: description.to_string(),
    }
}

pub struct GetCurrentDatetimeTool {
    descriptor: ToolDescriptor,
}

impl GetCurrentDatetimeTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "get_current_datetime".into(),
                description: "Get the current UTC date and time".into(),
                category: ToolCategory::Builtin,
                parameters: vec![],
                returns: "ISO-8601 timestamp".into(),
                credit_cost: None,
                requires_confirmation: false,
                tags: vec!["read_only".into()],
            },
        }
    }
}

impl Default for GetCurrentDatetimeTool {
    fn default() -> Self { Self::new() }
}

#[async_trait::async_trait]
impl Tool for GetCurrentDatetimeTool {
    fn descriptor(&self) -> &ToolDescriptor { &self.descriptor }

    async fn execute(&self, _args: Value) -> ToolResult {
        let now = chrono::Utc::now();
        ToolResult::json(serde_json::json!({
            "iso8601": now.to_rfc3339(),
            "unix_timestamp": now.timestamp(),
        }))
    }
}

pub struct CalculatorTool {
    descriptor: ToolDescriptor,
}

impl CalculatorTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "calculator".into(),
                description: "Evaluate a simple arithmetic expression (+, -, *, /, parentheses)".into(),
                category: ToolCategory::Builtin,
                parameters: vec![string_param("expression", "Arithmetic expression to evaluate", true)],
                returns: "numeric result".into(),
                credit_cost: None,
                requires_confirmation: false,
                tags: vec!["read_only".into()],
            },
        }
    }
}

impl Default for CalculatorTool {
    fn default() -> Self { Self::new() }
}

#[async_trait::async_trait]
impl Tool for CalculatorTool {
    fn descriptor(&self) -> &ToolDescriptor { &self.descriptor }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(expression) = args.get("expression").and_then(Value::as_str) else {
            return ToolResult::error("missing required parameter: expression");
        };
        match evaluate(expression) {
            Ok(result) => ToolResult::json(serde_json::json!({ "result": result })),
            Err(e) => ToolResult::error(e),
        }
    }
}

/// Tiny recursive-descent evaluator for `+ - * / ( )` over f64 literals.
/// Good enough for an agent asking "what's 15% of $4,200" — not a general
/// expression language.
fn evaluate(expr: &str) -> Result<f64, String> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let value = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err("unexpected trailing input".to_string());
    }
    Ok(value)
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => { i += 1; }
            '+' => { tokens.push(Token::Plus); i += 1; }
            '-' => { tokens.push(Token::Minus); i += 1; }
            '*' => { tokens.push(Token::Star); i += 1; }
            '/' => { tokens.push(Token::Slash); i += 1; }
            '(' => { tokens.push(Token::LParen); i += 1; }
            ')' => { tokens.push(Token::RParen); i += 1; }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let number: String = chars[start..i].iter().collect();
                let value = number.parse::<f64>().map_err(|_| format!("invalid number: {number}"))?;
                tokens.push(Token::Number(value));
            }
            other => return Err(format!("unexpected character: {other}")),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> { self.tokens.get(self.pos) }

    fn parse_expr(&mut self) -> Result<f64, String> {
        let mut value = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => { self.pos += 1; value += self.parse_term()?; }
                Some(Token::Minus) => { self.pos += 1; value -= self.parse_term()?; }
                _ => break,
            }
        }
        Ok(value)
    }

    fn parse_term(&mut self) -> Result<f64, String> {
        let mut value = self.parse_factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => { self.pos += 1; value *= self.parse_factor()?; }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let divisor = self.parse_factor()?;
                    if divisor == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn parse_factor(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(Token::Number(n)) => { let n = *n; self.pos += 1; Ok(n) }
            Some(Token::Minus) => { self.pos += 1; Ok(-self.parse_factor()?) }
            Some(Token::LParen) => {
                self.pos += 1;
                let value = self.parse_expr()?;
                match self.peek() {
                    Some(Token::RParen) => { self.pos += 1; Ok(value) }
                    _ => Err("expected closing parenthesis".to_string()),
                }
            }
            _ => Err("expected number or '('".to_string()),
        }
    }
}

/// Deterministic stub: no external search backend is specified by this
/// system's design, so `web_search` returns a fixed, clearly-synthetic
/// result set behind the same `Tool` interface a real backend would use.
pub struct WebSearchTool {
    descriptor: ToolDescriptor,
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "web_search".into(),
                description: "Search the web for a query (stubbed: no live search backend configured)".into(),
                category: ToolCategory::Builtin,
                parameters: vec![string_param("query", "Search query", true)],
                returns: "list of search results".into(),
                credit_cost: None,
                requires_confirmation: false,
                tags: vec!["read_only".into(), "stub".into()],
            },
        }
    }
}

impl Default for WebSearchTool {
    fn default() -> Self { Self::new() }
}

#[async_trait::async_trait]
impl Tool for WebSearchTool {
    fn descriptor(&self) -> &ToolDescriptor { &self.descriptor }

    async fn execute(&self, args: Value) -> ToolResult {
        let Some(query) = args.get("query").and_then(Value::as_str) else {
            return ToolResult::error("missing required parameter: query");
        };
        ToolResult::json(serde_json::json!({
            "query": query,
            "results": [],
            "note": "web_search has no live backend configured in this deployment",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn calculator_evaluates_basic_expression() {
        let tool = CalculatorTool::new();
        let result = tool.execute(serde_json::json!({ "expression": "2 + 3 * 4" })).await;
        let ToolResult::Json(v) = result else { panic!("expected json result") };
        assert_eq!(v["result"], 14.0);
    }

    #[tokio::test]
    async fn calculator_respects_parentheses() {
        let tool = CalculatorTool::new();
        let result = tool.execute(serde_json::json!({ "expression": "(2 + 3) * 4" })).await;
        let ToolResult::Json(v) = result else { panic!("expected json result") };
        assert_eq!(v["result"], 20.0);
    }

    #[tokio::test]
    async fn calculator_rejects_division_by_zero() {
        let tool = CalculatorTool::new();
        let result = tool.execute(serde_json::json!({ "expression": "1 / 0" })).await;
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn get_current_datetime_returns_iso8601() {
        let tool = GetCurrentDatetimeTool::new();
        let result = tool.execute(serde_json::json!({})).await;
        let ToolResult::Json(v) = result else { panic!("expected json result") };
        assert!(v["iso8601"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn web_search_stub_echoes_query_with_empty_results() {
        let tool = WebSearchTool::new();
        let result = tool.execute(serde_json::json!({ "query": "rust async runtimes" })).await;
        let ToolResult::Json(v) = result else { panic!("expected json result") };
        assert_eq!(v["query"], "rust async runtimes");
        assert_eq!(v["results"].as_array().unwrap().len(), 0);
    }
}
