//! Token listing in XML form.
use std::fmt::Write;

use crate::{error::JackResult, lexer::Lexer};

/// Write every token in the source as one XML element per line,
/// wrapped in a `<tokens>` root element.
///
/// Nothing is written past the first lexical error, but the
/// partially written listing is left in the writer.
pub fn write_tokens_xml<W: Write>(w: &mut W, source_code: &str) -> JackResult<()> {
    writeln!(w, "<tokens>")?;

    for token in Lexer::new(source_code) {
        let token = token?;
        let tag = token.class().tag();
        writeln!(w, "<{tag}> {} </{tag}>", Escape(token.text(source_code)))?;
    }

    writeln!(w, "</tokens>")?;
    Ok(())
}

/// Displays text with the XML special characters escaped.
struct Escape<'a>(&'a str);

impl<'a> std::fmt::Display for Escape<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                _ => f.write_char(c)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_token_listing() {
        let mut buf = String::new();
        write_tokens_xml(&mut buf, "if (x < 10) { let s = \"a&b\"; }").unwrap();

        assert_eq!(
            buf,
            "<tokens>\n\
             <keyword> if </keyword>\n\
             <symbol> ( </symbol>\n\
             <identifier> x </identifier>\n\
             <symbol> &lt; </symbol>\n\
             <integerConstant> 10 </integerConstant>\n\
             <symbol> ) </symbol>\n\
             <symbol> { </symbol>\n\
             <keyword> let </keyword>\n\
             <identifier> s </identifier>\n\
             <symbol> = </symbol>\n\
             <stringConstant> a&amp;b </stringConstant>\n\
             <symbol> ; </symbol>\n\
             <symbol> } </symbol>\n\
             </tokens>\n"
        );
    }

    #[test]
    fn test_lexical_error_stops_listing() {
        let mut buf = String::new();
        assert!(write_tokens_xml(&mut buf, "x $").is_err());
        assert_eq!(buf, "<tokens>\n<identifier> x </identifier>\n");
    }
}
