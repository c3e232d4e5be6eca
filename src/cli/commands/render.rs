use crate::cli::args::RenderArgs;
use mathtag::dom::Document;
use mathtag::{Installation, KatexRenderer, MathTags, Strategy};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::rc::Rc;

/// Summary printed with `--report`
#[derive(Serialize)]
struct Report {
    strategy: Strategy,
    inline: usize,
    block: usize,
    /// Macro table after rendering, including global definitions
    macros: BTreeMap<String, String>,
}

impl From<&Installation> for Report {
    fn from(installation: &Installation) -> Self {
        Self {
            strategy: installation.strategy,
            inline: installation.inline,
            block: installation.block,
            macros: installation.macros.entries().into_iter().collect(),
        }
    }
}

pub fn run(
    args: RenderArgs,
    output: Option<PathBuf>,
    report: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = args.settings()?;
    let html = std::fs::read_to_string(&args.input)?;

    let mut document = if args.fragment {
        Document::parse_fragment(&html)
    } else {
        Document::parse(&html)
    };
    if args.custom_elements {
        document = document.with_custom_elements();
    }

    let installation = MathTags::from_settings(Rc::new(KatexRenderer), &settings)
        .install(&mut document)?;

    match &output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            document.write_html(&mut writer)?;
            writer.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            document.write_html(&mut writer)?;
            writeln!(writer)?;
            writer.flush()?;
        }
    }

    if report {
        let summary = serde_json::to_string_pretty(&Report::from(&installation))?;
        eprintln!("{}", summary);
    }
    Ok(())
}
