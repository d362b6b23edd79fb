//! Output generation for run artifacts and the JSON report.
//!
//! # Submodules
//!
//! - [`artifacts`]: Reads and atomically writes the ordered text files passed
//!   between stages
//! - [`json`]: Joins headings and summaries into the end-of-run JSON report
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── links_temp.txt   # discovery: candidate links
//! ├── links.txt        # resolution: settled links (rewritten by extraction)
//! ├── links.txt.failures.json
//! ├── heading.txt      # extraction: Link/Heading blocks
//! ├── content.txt      # extraction: Source/Title/Text blocks
//! ├── summaries.txt    # summarization: Article n Summary blocks
//! └── report.json      # run: title, url and summary per article
//! ```

pub mod artifacts;
pub mod json;
