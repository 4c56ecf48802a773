/*!
 * Streaming reader for MediaWiki XML exports.
 *
 * Yields one [`Page`] per `<page>` element without loading the dump into
 * memory. Only `<title>`, `<ns>` and the revision `<text>` are kept.
 */

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::debug;
use quick_xml::Reader;
use quick_xml::events::Event;

/// Main (article) namespace
pub const MAIN_NAMESPACE: i64 = 0;

/// One page of a dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub namespace: i64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Namespace,
    Text,
}

#[derive(Debug, Default)]
struct PageBuilder {
    title: String,
    namespace: String,
    text: String,
}

impl PageBuilder {
    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Namespace => &mut self.namespace,
            Field::Text => &mut self.text,
        }
    }

    fn build(self) -> Result<Page> {
        let namespace = match self.namespace.trim() {
            "" => MAIN_NAMESPACE,
            ns => ns
                .parse()
                .with_context(|| format!("Invalid namespace '{}' on page '{}'", ns, self.title))?,
        };
        Ok(Page {
            title: self.title.trim().to_string(),
            namespace,
            text: self.text,
        })
    }
}

/// Iterator over the pages of a dump
pub struct DumpReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    namespace: Option<i64>,
    finished: bool,
}

impl DumpReader<BufReader<File>> {
    /// Open a dump file from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open dump: {:?}", path))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> DumpReader<R> {
    /// Read main-namespace pages from `source`
    pub fn new(source: R) -> Self {
        Self {
            reader: Reader::from_reader(source),
            buf: Vec::new(),
            namespace: Some(MAIN_NAMESPACE),
            finished: false,
        }
    }

    /// Only yield pages of `namespace`, or every page with `None`
    pub fn with_namespace(mut self, namespace: Option<i64>) -> Self {
        self.namespace = namespace;
        self
    }

    fn next_page(&mut self) -> Result<Option<Page>> {
        let mut page: Option<PageBuilder> = None;
        let mut field: Option<Field> = None;

        loop {
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|e| anyhow!("XML error at byte {}: {}", self.reader.buffer_position(), e))?;

            match event {
                Event::Start(start) => match start.name().as_ref() {
                    b"page" => page = Some(PageBuilder::default()),
                    b"title" if page.is_some() => field = Some(Field::Title),
                    b"ns" if page.is_some() => field = Some(Field::Namespace),
                    b"text" if page.is_some() => field = Some(Field::Text),
                    _ => {}
                },
                Event::Text(text) => {
                    if let (Some(builder), Some(field)) = (page.as_mut(), field) {
                        let unescaped = text.unescape().context("Invalid XML escape")?;
                        builder.field_mut(field).push_str(&unescaped);
                    }
                }
                Event::CData(data) => {
                    if let (Some(builder), Some(field)) = (page.as_mut(), field) {
                        builder
                            .field_mut(field)
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::End(end) => match end.name().as_ref() {
                    b"title" | b"ns" | b"text" => field = None,
                    b"page" => {
                        let Some(builder) = page.take() else {
                            continue;
                        };
                        let built = builder.build()?;
                        if self.namespace.map_or(true, |ns| ns == built.namespace) {
                            return Ok(Some(built));
                        }
                        debug!("Skipping '{}' in namespace {}", built.title, built.namespace);
                    }
                    _ => {}
                },
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for DumpReader<R> {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_page() {
            Ok(Some(page)) => Some(Ok(page)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
