//! Parse model replies into action numbers and strategies
//!
//! Replies are supposed to be a bare number, but models pad them with prose.
//! Extraction tries progressively looser patterns and returns the first
//! number the caller accepts.

use crate::agent::strategy::Strategy;
use nom::bytes::complete::{tag, take_till, take_while1};
use nom::character::complete::{digit1, multispace0, satisfy, u32 as number};
use nom::combinator::all_consuming;
use nom::error::Error;
use nom::sequence::{delimited, preceded, terminated};
use nom::{IResult, Parser};

/// `"3"`, `" 3 "`
fn bare_number(input: &str) -> IResult<&str, u32> {
    all_consuming(delimited(multispace0, number, multispace0)).parse(input)
}

fn separator(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c == ':' || c.is_whitespace()).parse(input)
}

/// `"action: 3"`, `"choose 3"`
fn keyword_number<'a>(keyword: &'static str) -> impl Parser<&'a str, Output = u32, Error = Error<&'a str>> {
    preceded((tag(keyword), separator), number)
}

/// `"3: because..."`, `"3. attack"`
fn leading_number(input: &str) -> IResult<&str, u32> {
    terminated(number, satisfy(|c| c == ':' || c == '.' || c.is_whitespace())).parse(input)
}

/// Every match of `parser` starting at any position, left to right
fn matches_anywhere<'a, P>(text: &'a str, mut parser: P) -> Vec<u32>
where
    P: Parser<&'a str, Output = u32, Error = Error<&'a str>>,
{
    text.char_indices()
        .filter_map(|(i, _)| parser.parse(&text[i..]).ok().map(|(_, n)| n))
        .collect()
}

/// Every maximal run of digits that fits in a `u32`
fn digit_runs(text: &str) -> Vec<u32> {
    let mut found = Vec::new();
    let mut input = text;
    loop {
        let gap: IResult<&str, &str> = take_till(|c: char| c.is_ascii_digit()).parse(input);
        let Ok((rest, _)) = gap else { break };
        let run: IResult<&str, &str> = digit1(rest);
        let Ok((rest, digits)) = run else { break };
        if let Ok(n) = digits.parse::<u32>() {
            found.push(n);
        }
        input = rest;
    }
    found
}

/// Pull an action number out of a model reply.
///
/// Patterns in order: bare integer, `action N`, `choose N`, a leading `N`
/// followed by punctuation or space, then any digit run. The first number
/// `accept` approves wins.
pub fn extract_number(text: &str, accept: impl Fn(u32) -> bool) -> Option<u32> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    let passes: [Vec<u32>; 5] = [
        bare_number(&text).ok().map(|(_, n)| n).into_iter().collect(),
        matches_anywhere(&text, keyword_number("action")),
        matches_anywhere(&text, keyword_number("choose")),
        leading_number(&text).ok().map(|(_, n)| n).into_iter().collect(),
        digit_runs(&text),
    ];

    passes
        .into_iter()
        .flat_map(Vec::into_iter)
        .find(|&n| accept(n))
}

/// Case-insensitive substring match against the strategy vocabulary,
/// checked in [`Strategy::ALL`] order
pub fn parse_strategy(text: &str) -> Option<Strategy> {
    let upper = text.trim().to_uppercase();
    Strategy::ALL
        .into_iter()
        .find(|s| upper.contains(&s.name().to_uppercase()))
}
