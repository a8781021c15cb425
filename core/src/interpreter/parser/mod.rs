//! PEST-based parser for the jss language
//!
//! Produces the AST consumed by the bytecode compiler.

use pest::error::LineColLocation;
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use super::types::ast::{BinOp, Expr, Program, Stmt};


/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "interpreter/parser/jss.pest"]
struct JssParser;

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The source does not match the grammar
    #[error("line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    /// The parse tree could not be turned into an AST
    #[error("{0}")]
    Build(String),
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, column) = match err.line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        };
        ParseError::Syntax {
            line,
            column,
            message: err.variant.message().into_owned(),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Public API ===================== */

/// Parse a source string into a program
pub fn parse(source: &str) -> ParseResult<Program> {
    let mut pairs = JssParser::parse(Rule::program, source)?;
    let program = next_pair(&mut pairs, "program")?;

    let body = program
        .into_inner()
        .filter(|pair| pair.as_rule() == Rule::statement)
        .map(build_statement)
        .collect::<ParseResult<Vec<_>>>()?;

    tracing::debug!(statements = body.len(), "parsed program");
    Ok(Program { body })
}

/* ===================== AST Builder ===================== */

fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, what: &str) -> ParseResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| ParseError::Build(format!("Expected {}", what)))
}

fn unexpected(pair: &Pair<Rule>) -> ParseError {
    ParseError::Build(format!("Unexpected rule: {:?}", pair.as_rule()))
}

fn build_block(pair: Pair<Rule>) -> ParseResult<Vec<Stmt>> {
    // block = { "{" ~ statement* ~ "}" }
    pair.into_inner().map(build_statement).collect()
}

fn build_statement(pair: Pair<Rule>) -> ParseResult<Stmt> {
    match pair.as_rule() {
        Rule::statement => {
            let inner = next_pair(&mut pair.into_inner(), "statement")?;
            build_statement(inner)
        }
        Rule::while_stmt | Rule::if_stmt => {
            // kw ~ "(" ~ expr ~ ")" ~ block
            let is_while = pair.as_rule() == Rule::while_stmt;
            let mut inner = pair.into_inner().filter(|p| !is_keyword(p));
            let test = inner
                .next()
                .ok_or_else(|| ParseError::Build("Expected condition".to_string()))
                .and_then(build_expression)?;
            let body = inner
                .next()
                .ok_or_else(|| ParseError::Build("Expected block".to_string()))
                .and_then(build_block)?;

            if is_while {
                Ok(Stmt::While { test, body })
            } else {
                Ok(Stmt::If { test, body })
            }
        }
        Rule::return_stmt => {
            // return_stmt = { kw_return ~ expr? ~ ";" }
            let value = pair
                .into_inner()
                .find(|p| p.as_rule() == Rule::expr)
                .map(build_expression)
                .transpose()?;
            Ok(Stmt::Return { value })
        }
        Rule::function_stmt => {
            let def = next_pair(&mut pair.into_inner(), "function definition")?;
            Ok(Stmt::Expr {
                expr: build_function(def)?,
            })
        }
        Rule::assign_stmt => {
            // assign_stmt = { identifier ~ "=" ~ expr ~ ";" }
            let mut inner = pair.into_inner();
            let name = next_pair(&mut inner, "variable name")?.as_str().to_string();
            let expr = build_expression(next_pair(&mut inner, "expression")?)?;
            Ok(Stmt::Assign { name, expr })
        }
        Rule::expr_stmt => {
            let expr = build_expression(next_pair(&mut pair.into_inner(), "expression")?)?;
            Ok(Stmt::Expr { expr })
        }
        _ => Err(unexpected(&pair)),
    }
}

fn is_keyword(pair: &Pair<Rule>) -> bool {
    matches!(
        pair.as_rule(),
        Rule::kw_while | Rule::kw_if | Rule::kw_return | Rule::kw_function
    )
}

fn build_expression(pair: Pair<Rule>) -> ParseResult<Expr> {
    match pair.as_rule() {
        Rule::expr | Rule::additive | Rule::multitive => build_binary_chain(pair),
        Rule::call => {
            // call = { fndef ~ call_args* }
            let mut inner = pair.into_inner();
            let mut expr = build_expression(next_pair(&mut inner, "callee")?)?;

            for args_pair in inner {
                let args = args_pair
                    .into_inner()
                    .map(build_expression)
                    .collect::<ParseResult<Vec<_>>>()?;
                expr = Expr::call(expr, args);
            }

            Ok(expr)
        }
        Rule::fndef | Rule::primary => {
            let inner = next_pair(&mut pair.into_inner(), "expression")?;
            build_expression(inner)
        }
        Rule::function_def => build_function(pair),
        Rule::identifier => Ok(Expr::ident(pair.as_str())),
        Rule::number => {
            let num_str = pair.as_str();
            let value = num_str.parse::<f64>().map_err(|e| {
                ParseError::Build(format!("Failed to parse number '{}': {}", num_str, e))
            })?;
            Ok(Expr::num(value))
        }
        Rule::boolean => Ok(Expr::LitBool {
            v: pair.as_str() == "true",
        }),
        Rule::string => {
            // string = ${ "\"" ~ string_content ~ "\"" }
            let content = next_pair(&mut pair.into_inner(), "string content")?;
            Ok(Expr::LitStr {
                v: content.as_str().to_string(),
            })
        }
        _ => Err(unexpected(&pair)),
    }
}

/// Fold `operand (op operand)*` into a left-associative tree
fn build_binary_chain(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut inner = pair.into_inner();
    let mut expr = build_expression(next_pair(&mut inner, "operand")?)?;

    while let Some(op_pair) = inner.next() {
        let op = BinOp::from_symbol(op_pair.as_str()).ok_or_else(|| {
            ParseError::Build(format!("Unknown operator '{}'", op_pair.as_str()))
        })?;
        let right = build_expression(next_pair(&mut inner, "right operand")?)?;
        expr = Expr::binop(op, expr, right);
    }

    Ok(expr)
}

fn build_function(pair: Pair<Rule>) -> ParseResult<Expr> {
    // function_def = { kw_function ~ identifier ~ "(" ~ param_list? ~ ")" ~ block }
    let mut inner = pair.into_inner().filter(|p| !is_keyword(p));
    let name = inner
        .next()
        .ok_or_else(|| ParseError::Build("Expected function name".to_string()))?
        .as_str()
        .to_string();

    let mut params = Vec::new();
    let mut body = Vec::new();
    for part in inner {
        match part.as_rule() {
            Rule::param_list => {
                params = part.into_inner().map(|p| p.as_str().to_string()).collect();
            }
            Rule::block => body = build_block(part)?,
            _ => return Err(unexpected(&part)),
        }
    }

    Ok(Expr::Function { name, params, body })
}
