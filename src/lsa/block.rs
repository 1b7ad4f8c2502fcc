//! Block segmentation.
//!
//! A dump is a sequence of LSA blocks, each starting at an `LS age:` line.
//! Section headers such as `Router Link States (Area 1)` are not blocks; they
//! set the area every following block inherits until the next header.
//!
//! Segmentation is a left-to-right fold over lines carrying the current area,
//! producing `(area, lines)` blocks that can be parsed independently.

use crate::Result;
use crate::topology::BACKBONE_AREA;
use regex::Regex;

/// One LSA block and the area it was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct LsaBlock<'a> {
    pub area: String,
    pub age: Option<u32>,
    pub lines: Vec<&'a str>,
}

/// Line patterns that drive segmentation.
#[derive(Debug, Clone)]
pub struct BlockMarkers {
    age: Regex,
    area_header: Regex,
}

impl BlockMarkers {
    pub fn new() -> Result<Self> {
        Ok(Self {
            age: Regex::new(r"(?i)^\s*LS age:\s*(\d+)")?,
            area_header: Regex::new(r"(?i)Link States\s*\(Area\s+([^)\s]+)\s*\)")?,
        })
    }
}

struct Segmenter<'a> {
    area: String,
    current: Option<LsaBlock<'a>>,
    done: Vec<LsaBlock<'a>>,
}

impl<'a> Segmenter<'a> {
    fn new() -> Self {
        Self {
            area: BACKBONE_AREA.to_string(),
            current: None,
            done: Vec::new(),
        }
    }

    fn push(mut self, line: &'a str, markers: &BlockMarkers) -> Self {
        if let Some(caps) = markers.area_header.captures(line) {
            self.area = caps[1].to_string();
            return self;
        }

        if let Some(caps) = markers.age.captures(line) {
            self.done.extend(self.current.take());
            self.current = Some(LsaBlock {
                area: self.area.clone(),
                age: caps[1].parse().ok(),
                lines: vec![line],
            });
            return self;
        }

        // Lines before the first block carry nothing we use.
        if let Some(block) = self.current.as_mut() {
            block.lines.push(line);
        }
        self
    }

    fn finish(mut self) -> Vec<LsaBlock<'a>> {
        self.done.extend(self.current.take());
        self.done
    }
}

/// Split a dump into LSA blocks tagged with their area.
pub fn segment<'a>(text: &'a str, markers: &BlockMarkers) -> Vec<LsaBlock<'a>> {
    text.lines()
        .fold(Segmenter::new(), |seg, line| seg.push(line, markers))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DUMP: &str = r#"
            OSPF Router with ID (1.1.1.1) (Process ID 1)

                Router Link States (Area 0)

  LS age: 120
  LS Type: Router Links
  Link State ID: 1.1.1.1

  LS age: 33
  LS Type: Router Links
  Link State ID: 2.2.2.2

                Router Link States (Area 1)

  LS age: 7
  LS Type: Router Links
  Link State ID: 4.4.4.4
"#;

    #[test]
    fn blocks_inherit_the_running_area() {
        let markers = BlockMarkers::new().unwrap();
        let blocks = segment(DUMP, &markers);

        let summary: Vec<(String, Option<u32>, usize)> = blocks
            .iter()
            .map(|b| (b.area.clone(), b.age, b.lines.len()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("0".to_string(), Some(120), 4),
                ("0".to_string(), Some(33), 5),
                ("1".to_string(), Some(7), 3),
            ]
        );
        assert_eq!(blocks[2].lines[2].trim(), "Link State ID: 4.4.4.4");
    }

    #[test]
    fn area_defaults_to_backbone_and_headers_are_not_blocks() {
        let markers = BlockMarkers::new().unwrap();
        let text =
            "LS age: 1\nLS Type: Router Links\n  Summary Net Link States (Area 3)\nLS age: 2\n";
        let blocks = segment(text, &markers);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].area, "0");
        assert_eq!(blocks[0].lines, vec!["LS age: 1", "LS Type: Router Links"]);
        assert_eq!(blocks[1].area, "3");
    }

    #[test]
    fn no_blocks_in_free_text() {
        let markers = BlockMarkers::new().unwrap();
        assert!(segment("% Invalid input detected\n", &markers).is_empty());
        assert!(segment("", &markers).is_empty());
    }
}
