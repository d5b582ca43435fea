//! lax: inspect HTML the way a tolerant parser sees it.
//!
//! ```text
//! lax tree page.html            # outline of the parsed tree
//! lax errors page.html          # recoveries made while parsing
//! lax detect page.html          # declared / detected encoding
//! lax select '//a[@href]' page.html
//! lax save --xml page.html      # re-serialize
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use lax_common::warning::set_quiet;
use lax_dom::NodeKind;
use lax_html::encoding::require_encoding;
use lax_html::entities::de_entitize;
use lax_html::{HtmlDocument, ParseOptions, tree_to_string};
use owo_colors::OwoColorize;

/// Parse HTML with a forgiving single-pass parser and inspect the result
#[derive(Parser, Debug)]
#[command(name = "lax")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Print the parsed tree of a file
    lax tree ./index.html

    # Parse inline HTML and list the recoveries
    lax errors --html '<ul><li>one<li>two'

    # Stop at <body> and report the declared charset
    lax detect --stopper body ./index.html

    # Print the text of every matching node
    lax select '//div[@class="note"]' ./index.html

    # Write the document back out as XML
    lax save --xml ./index.html
"#)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print an outline of the parsed tree
    Tree(Common),
    /// List the parse errors recorded while repairing the markup
    Errors(Common),
    /// Report the encoding declared in the document
    Detect(Common),
    /// Evaluate a path expression and print each match
    Select {
        /// Path expression, e.g. `//li[2]`
        path: String,
        /// Print the outer HTML of each match instead of its text
        #[arg(long)]
        outer: bool,
        #[command(flatten)]
        common: Common,
    },
    /// Serialize the document
    Save {
        /// Write well-formed XML instead of HTML
        #[arg(long)]
        xml: bool,
        #[command(flatten)]
        common: Common,
    },
}

impl Command {
    const fn common(&self) -> &Common {
        match self {
            Self::Tree(common)
            | Self::Errors(common)
            | Self::Detect(common)
            | Self::Select { common, .. }
            | Self::Save { common, .. } => common,
        }
    }
}

#[derive(Args, Debug)]
struct Common {
    /// HTML file to read; its bytes are decoded with the detected encoding
    #[arg(value_name = "FILE")]
    path: Option<PathBuf>,

    /// Parse this HTML string instead of a file
    #[arg(long, value_name = "HTML")]
    html: Option<String>,

    #[command(flatten)]
    parse: ParseFlags,
}

#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
struct ParseFlags {
    /// Close a re-opened element that is already open (li inside li)
    #[arg(long)]
    fix_nested_tags: bool,

    /// Stop parsing at the first tag with this name
    #[arg(long, value_name = "NAME")]
    stopper: Option<String>,

    /// Do not record missing end tags as errors
    #[arg(long)]
    no_check_syntax: bool,

    /// Attach a source snippet of at most N bytes to each error
    #[arg(long, value_name = "N")]
    extract_source: Option<usize>,

    /// Write element and attribute names in upper case
    #[arg(long)]
    upper_case: bool,

    /// Write element and attribute names as they appeared in the source
    #[arg(long)]
    original_case: bool,

    /// Write childless elements with an explicit end tag
    #[arg(long)]
    write_empty_nodes: bool,

    /// Leave attribute values unquoted where that is safe
    #[arg(long)]
    optimize_attributes: bool,

    /// Add `_closed` and `_children` attributes to closed elements
    #[arg(long)]
    debug_attributes: bool,

    /// Decode input bytes without a Byte Order Mark or declaration with this
    /// charset (default UTF-8)
    #[arg(long, value_name = "LABEL")]
    encoding: Option<String>,

    /// Silence one-time warnings on stderr
    #[arg(short, long)]
    quiet: bool,
}

impl ParseFlags {
    fn options(&self, xml: bool) -> Result<ParseOptions> {
        let mut options = ParseOptions::default()
            .with_check_syntax(!self.no_check_syntax)
            .with_fix_nested_tags(self.fix_nested_tags)
            .with_upper_case(self.upper_case)
            .with_original_case(self.original_case)
            .with_write_empty_nodes(self.write_empty_nodes)
            .with_optimized_attribute_values(self.optimize_attributes)
            .with_debugging_attributes(self.debug_attributes)
            .with_xml_output(xml);
        if let Some(name) = &self.stopper {
            options = options.with_stopper(name);
        }
        if let Some(max) = self.extract_source {
            options = options.with_error_source_text(max);
        }
        if let Some(label) = &self.encoding {
            options = options.with_default_stream_encoding(require_encoding(label)?);
        }
        Ok(options)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let common = cli.command.common();
    set_quiet(common.parse.quiet);

    let xml = matches!(cli.command, Command::Save { xml: true, .. });
    let options = common.parse.options(xml)?;
    let doc = load_doc(common, &options)?;

    match &cli.command {
        Command::Tree(_) => print!("{}", tree_to_string(doc.tree(), doc.root())),
        Command::Errors(_) => print_errors(&doc),
        Command::Detect(_) => print_encoding(&doc),
        Command::Select { path, outer, .. } => print_matches(&doc, path, *outer)?,
        Command::Save { .. } => println!("{}", doc.save()),
    }
    Ok(())
}

/// Load the document named on the command line
fn load_doc(input: &Common, options: &ParseOptions) -> Result<HtmlDocument> {
    if let Some(html) = &input.html {
        HtmlDocument::parse_with_options(html, options).context("failed to parse --html input")
    } else if let Some(path) = &input.path {
        let bytes =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        HtmlDocument::detect_encoding_and_load(&bytes, options)
            .with_context(|| format!("failed to parse {}", path.display()))
    } else {
        bail!("an input is required: pass a FILE or --html")
    }
}

fn print_errors(doc: &HtmlDocument) {
    if doc.errors().is_empty() {
        println!("{}", "no parse errors".green());
        return;
    }
    for error in doc.errors() {
        println!(
            "{} {}:{} {}",
            error.code.yellow(),
            error.line,
            error.column,
            error.reason
        );
        if !error.source_text.is_empty() {
            println!("    {}", error.source_text.dimmed());
        }
    }
    println!("{} error(s)", doc.errors().len().bold());
}

fn print_encoding(doc: &HtmlDocument) {
    let name = |encoding: Option<&'static encoding_rs::Encoding>| {
        encoding.map_or("(none)", |e| e.name())
    };
    println!("declared: {}", name(doc.declared_encoding()).bold());
    println!("stream:   {}", name(doc.stream_encoding()));
    if let Some(remainder) = doc.remainder() {
        println!(
            "stopped at offset {} ({} bytes unparsed)",
            remainder.offset,
            remainder.text.len()
        );
    }
}

fn print_matches(doc: &HtmlDocument, path: &str, outer: bool) -> Result<()> {
    let matches = doc
        .select(path)
        .with_context(|| format!("failed to evaluate {path}"))?;
    let tree = doc.tree();
    for id in &matches {
        let line = if outer {
            tree.outer_html(*id).to_string()
        } else {
            match tree.kind(*id) {
                Some(NodeKind::Comment) => tree.as_comment(*id).unwrap_or_default().to_string(),
                _ => de_entitize(&tree.inner_text(*id)).into_owned(),
            }
        };
        println!("{line}");
    }
    if matches.is_empty() {
        eprintln!("{}", "no matches".red());
    }
    Ok(())
}
