//! hOCR document model
//!
//! Tesseract's hOCR output nests `ocr_carea` blocks, `ocr_par` paragraphs,
//! text lines, `ocrx_word` words and (with `hocr_char_boxes`) `ocrx_cinfo`
//! characters. Geometry and confidences live in the `title` attribute.

use lookout_raster::Rect;

use crate::engine::{Fragment, Granularity};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HocrSymbol {
    pub bbox: Option<Rect>,
    pub confidence: f32,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HocrWord {
    pub bbox: Option<Rect>,
    pub confidence: f32,
    pub text: String,
    pub symbols: Vec<HocrSymbol>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HocrLine {
    pub bbox: Option<Rect>,
    pub words: Vec<HocrWord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HocrParagraph {
    pub bbox: Option<Rect>,
    pub lines: Vec<HocrLine>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HocrBlock {
    pub bbox: Option<Rect>,
    pub paragraphs: Vec<HocrParagraph>,
}

/// A parsed hOCR page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HocrPage {
    pub blocks: Vec<HocrBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Block,
    Paragraph,
    Line,
    Word,
    Symbol,
    Other,
}

impl HocrLine {
    fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl HocrParagraph {
    fn text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.text());
            out.push('\n');
        }
        out
    }

    fn words(&self) -> impl Iterator<Item = &HocrWord> {
        self.lines.iter().flat_map(|l| l.words.iter())
    }
}

impl HocrBlock {
    fn text(&self) -> String {
        let mut out = String::new();
        for para in &self.paragraphs {
            out.push_str(&para.text());
            out.push('\n');
        }
        out
    }

    fn words(&self) -> impl Iterator<Item = &HocrWord> {
        self.paragraphs.iter().flat_map(|p| p.words())
    }
}

fn mean_confidence<'a>(words: impl Iterator<Item = &'a HocrWord>) -> f32 {
    let (sum, count) = words.fold((0.0f32, 0usize), |(s, n), w| (s + w.confidence, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Split a word box evenly between its characters when the engine did not
/// report character boxes
fn split_word(word: &HocrWord, bbox: Rect) -> Vec<Fragment> {
    let chars: Vec<char> = word.text.chars().collect();
    let n = chars.len() as u64;
    chars
        .iter()
        .enumerate()
        .map(|(i, ch)| {
            let left = (bbox.width as u64 * i as u64 / n) as i32;
            let right = (bbox.width as u64 * (i as u64 + 1) / n) as i32;
            Fragment {
                text: ch.to_string(),
                confidence: word.confidence,
                bbox: Rect::new(bbox.x + left, bbox.y, (right - left).max(1) as u32, bbox.height),
            }
        })
        .collect()
}

impl HocrPage {
    /// Flatten the page into fragments at `granularity`, in document order.
    ///
    /// Elements without a bounding box are skipped.
    pub fn fragments(&self, granularity: Granularity) -> Vec<Fragment> {
        let mut out = Vec::new();
        for block in &self.blocks {
            if granularity == Granularity::Block {
                if let Some(bbox) = block.bbox {
                    out.push(Fragment {
                        text: block.text(),
                        confidence: mean_confidence(block.words()),
                        bbox,
                    });
                }
                continue;
            }
            for para in &block.paragraphs {
                if granularity == Granularity::Paragraph {
                    if let Some(bbox) = para.bbox {
                        out.push(Fragment {
                            text: para.text(),
                            confidence: mean_confidence(para.words()),
                            bbox,
                        });
                    }
                    continue;
                }
                for line in &para.lines {
                    if granularity == Granularity::Line {
                        if let Some(bbox) = line.bbox {
                            out.push(Fragment {
                                text: line.text(),
                                confidence: mean_confidence(line.words.iter()),
                                bbox,
                            });
                        }
                        continue;
                    }
                    for word in &line.words {
                        let Some(bbox) = word.bbox else { continue };
                        match granularity {
                            Granularity::Word => out.push(Fragment {
                                text: word.text.clone(),
                                confidence: word.confidence,
                                bbox,
                            }),
                            _ if word.symbols.is_empty() => out.extend(split_word(word, bbox)),
                            _ => out.extend(word.symbols.iter().filter_map(|s| {
                                s.bbox.map(|bbox| Fragment {
                                    text: s.text.clone(),
                                    confidence: s.confidence,
                                    bbox,
                                })
                            })),
                        }
                    }
                }
            }
        }
        out
    }

    fn block(&mut self) -> &mut HocrBlock {
        if self.blocks.is_empty() {
            self.blocks.push(HocrBlock::default());
        }
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }

    fn paragraph(&mut self) -> &mut HocrParagraph {
        let block = self.block();
        if block.paragraphs.is_empty() {
            block.paragraphs.push(HocrParagraph::default());
        }
        let last = block.paragraphs.len() - 1;
        &mut block.paragraphs[last]
    }

    fn line(&mut self) -> &mut HocrLine {
        let para = self.paragraph();
        if para.lines.is_empty() {
            para.lines.push(HocrLine::default());
        }
        let last = para.lines.len() - 1;
        &mut para.lines[last]
    }

    fn word(&mut self) -> &mut HocrWord {
        let line = self.line();
        if line.words.is_empty() {
            line.words.push(HocrWord::default());
        }
        let last = line.words.len() - 1;
        &mut line.words[last]
    }

    fn symbol(&mut self) -> &mut HocrSymbol {
        let word = self.word();
        if word.symbols.is_empty() {
            word.symbols.push(HocrSymbol::default());
        }
        let last = word.symbols.len() - 1;
        &mut word.symbols[last]
    }

    fn open(&mut self, node: Node, title: Option<&str>) {
        let bbox = title.and_then(|t| title_rect(t, "bbox"));
        match node {
            Node::Block => self.blocks.push(HocrBlock {
                bbox,
                ..Default::default()
            }),
            Node::Paragraph => self.block().paragraphs.push(HocrParagraph {
                bbox,
                ..Default::default()
            }),
            Node::Line => self.paragraph().lines.push(HocrLine {
                bbox,
                ..Default::default()
            }),
            Node::Word => {
                let confidence = title
                    .and_then(|t| title_property(t, "x_wconf"))
                    .and_then(|v| v.split_whitespace().next()?.parse().ok())
                    .unwrap_or(0.0);
                self.line().words.push(HocrWord {
                    bbox,
                    confidence,
                    ..Default::default()
                })
            }
            Node::Symbol => {
                let bbox = title.and_then(|t| title_rect(t, "x_bboxes"));
                let confidence = title
                    .and_then(|t| title_property(t, "x_conf"))
                    .and_then(|v| v.split_whitespace().next()?.parse().ok())
                    .unwrap_or(0.0);
                self.word().symbols.push(HocrSymbol {
                    bbox,
                    confidence,
                    ..Default::default()
                })
            }
            Node::Other => {}
        }
    }

    fn close(&mut self, node: Node) {
        match node {
            Node::Symbol => {
                let symbol = self.symbol();
                symbol.text = decode_entities(&symbol.text);
            }
            Node::Word => {
                let word = self.word();
                word.text = if word.symbols.is_empty() {
                    decode_entities(&word.text).trim().to_string()
                } else {
                    word.symbols.iter().map(|s| s.text.as_str()).collect()
                };
            }
            _ => {}
        }
    }
}

/// Parse a Tesseract hOCR document. Unknown markup is ignored.
pub fn parse(hocr: &str) -> HocrPage {
    let bytes = hocr.as_bytes();
    let mut page = HocrPage::default();
    let mut stack: Vec<Node> = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] == b'<' {
            let end = match find_byte(bytes, b'>', i) {
                Some(end) => end,
                None => break,
            };
            let tag = &hocr[i + 1..end];
            i = end + 1;

            if tag.starts_with('/') {
                if let Some(node) = stack.pop() {
                    page.close(node);
                }
                continue;
            }
            // declarations, comments and void elements never hold text
            if tag.starts_with('!') || tag.starts_with('?') || tag.ends_with('/') {
                continue;
            }

            let node = classify(tag);
            page.open(node, extract_attr(tag, "title"));
            stack.push(node);
        } else {
            let end = find_byte(bytes, b'<', i).unwrap_or(bytes.len());
            let text = &hocr[i..end];
            i = end;

            match stack.iter().rev().find(|n| matches!(n, Node::Word | Node::Symbol)) {
                Some(Node::Symbol) => page.symbol().text.push_str(text),
                Some(Node::Word) => page.word().text.push_str(text),
                _ => {}
            }
        }
    }

    page
}

fn classify(tag: &str) -> Node {
    let Some(class) = extract_attr(tag, "class") else {
        return Node::Other;
    };
    for name in class.split_whitespace() {
        match name {
            "ocr_carea" => return Node::Block,
            "ocr_par" => return Node::Paragraph,
            "ocr_line" | "ocr_header" | "ocr_caption" | "ocr_textfloat" => return Node::Line,
            "ocrx_word" => return Node::Word,
            "ocrx_cinfo" => return Node::Symbol,
            _ => {}
        }
    }
    Node::Other
}

fn find_byte(haystack: &[u8], needle: u8, from: usize) -> Option<usize> {
    haystack[from..]
        .iter()
        .position(|b| *b == needle)
        .map(|pos| from + pos)
}

/// Quoted attribute value from the inside of a start tag
fn extract_attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!(" {}=", name);
    let idx = tag.find(&needle)?;
    let rest = &tag[idx + needle.len()..];
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &rest[1..];
    let end = rest.find(quote)?;
    Some(&rest[..end])
}

/// Value of one `key value...` entry in a `;`-separated title
fn title_property<'a>(title: &'a str, key: &str) -> Option<&'a str> {
    title.split(';').map(str::trim).find_map(|entry| {
        let rest = entry.strip_prefix(key)?;
        (rest.is_empty() || rest.starts_with(' ')).then(|| rest.trim())
    })
}

fn title_rect(title: &str, key: &str) -> Option<Rect> {
    let nums = title_property(title, key)?
        .split_whitespace()
        .take(4)
        .map(|v| v.parse::<i32>().ok())
        .collect::<Option<Vec<_>>>()?;
    if nums.len() != 4 {
        return None;
    }
    let (x1, y1, x2, y2) = (nums[0], nums[1], nums[2], nums[3]);
    if x2 < x1 || y2 < y1 {
        return None;
    }
    Some(Rect::new(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32))
}

fn decode_entities(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => {
                    let code = if let Some(hex) = entity.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse().ok()
                    } else {
                        None
                    };
                    code.and_then(char::from_u32)
                }
            };
            ch.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((ch, len)) => {
                out.push(ch);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN">
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="en" lang="en">
 <head>
  <title></title>
  <meta http-equiv="Content-Type" content="text/html;charset=utf-8"/>
  <meta name='ocr-system' content='tesseract 5.3.0' />
 </head>
 <body>
  <div class='ocr_page' id='page_1' title='image "in.png"; bbox 0 0 400 200; ppageno 0; scan_res 300 300'>
   <div class='ocr_carea' id='block_1_1' title="bbox 10 20 190 80">
    <p class='ocr_par' id='par_1_1' lang='eng' title="bbox 10 20 190 80">
     <span class='ocr_line' id='line_1_1' title="bbox 10 20 190 45; baseline 0 -4; x_size 25">
      <span class='ocrx_word' id='word_1_1' title='bbox 10 20 70 45; x_wconf 96'><span class='ocrx_cinfo' title='x_bboxes 10 20 40 45; x_conf 99.5'>O</span><span class='ocrx_cinfo' title='x_bboxes 40 20 70 45; x_conf 97'>K</span></span>
      <span class='ocrx_word' id='word_1_2' title='bbox 90 20 190 45; x_wconf 90'>Save &amp; Exit</span>
     </span>
     <span class='ocr_line' id='line_1_2' title="bbox 10 55 100 80; baseline 0 -4; x_size 25">
      <span class='ocrx_word' id='word_1_3' title='bbox 10 55 100 80; x_wconf 60'><strong>Cancel</strong></span>
     </span>
    </p>
   </div>
   <div class='ocr_carea' id='block_1_2' title="bbox 200 150 260 170">
    <p class='ocr_par' id='par_1_2' lang='eng' title="bbox 200 150 260 170">
     <span class='ocr_header' id='line_1_3' title="bbox 200 150 260 170">
      <span class='ocrx_word' id='word_1_4' title='bbox 200 150 260 170; x_wconf 88'>abc</span>
     </span>
    </p>
   </div>
  </div>
 </body>
</html>
"#;

    #[test]
    fn test_structure() {
        let page = parse(SAMPLE);
        assert_eq!(page.blocks.len(), 2);
        assert_eq!(page.blocks[0].paragraphs[0].lines.len(), 2);
        let word = &page.blocks[0].paragraphs[0].lines[0].words[0];
        assert_eq!(word.text, "OK");
        assert_eq!(word.symbols.len(), 2);
        assert_eq!(word.bbox, Some(Rect::new(10, 20, 60, 25)));
    }

    #[test]
    fn test_word_fragments() {
        let words = parse(SAMPLE).fragments(Granularity::Word);
        let texts: Vec<&str> = words.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["OK", "Save & Exit", "Cancel", "abc"]);
        assert_eq!(words[2].confidence, 60.0);
        assert_eq!(words[3].bbox, Rect::new(200, 150, 60, 20));
    }

    #[test]
    fn test_symbol_fragments() {
        let symbols = parse(SAMPLE).fragments(Granularity::Symbol);
        assert_eq!(symbols[0].text, "O");
        assert_eq!(symbols[0].bbox, Rect::new(10, 20, 30, 25));
        assert_eq!(symbols[1].confidence, 97.0);
        // "abc" has no character boxes and is split evenly
        let tail = &symbols[symbols.len() - 3..];
        assert_eq!(tail[0].bbox, Rect::new(200, 150, 20, 20));
        assert_eq!(tail[2].text, "c");
        assert_eq!(tail[2].bbox, Rect::new(240, 150, 20, 20));
    }

    #[test]
    fn test_line_paragraph_block_text() {
        let page = parse(SAMPLE);
        let lines = page.fragments(Granularity::Line);
        assert_eq!(lines[0].text, "OK Save & Exit");
        assert_eq!(lines[0].confidence, 93.0);
        assert_eq!(lines[2].text, "abc");

        let paras = page.fragments(Granularity::Paragraph);
        assert_eq!(paras[0].text, "OK Save & Exit\nCancel\n");
        assert_eq!(paras[0].confidence, 82.0);

        let blocks = page.fragments(Granularity::Block);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].text, "abc\n\n");
        assert_eq!(blocks[1].bbox, Rect::new(200, 150, 60, 20));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#39;c&#x27;"), "a <b> 'c'");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
    }

    #[test]
    fn test_empty_document() {
        assert!(parse("").blocks.is_empty());
        assert!(parse("<html><body></body></html>").fragments(Granularity::Word).is_empty());
    }
}
