//! XML catalog document codec and file-backed catalog store.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use log::{error, info};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::book::{BookRecord, BookState};
use crate::types::BookUid;

use super::{CatalogStore, StorageError, StorageResult};

/// Format marker carried on the root element.
pub const CATALOG_FORMAT_VERSION: &str = "1";

/// Serializes a record list into a catalog document.
///
/// The document is a `<bookcase>` root wrapping one `<book>` element per
/// record; identity, revision, and state ride as attributes and the
/// descriptive fields as child text elements. Tombstones are written like
/// any other record so deletions survive the round-trip.
pub fn encode_catalog(books: &[BookRecord]) -> StorageResult<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("bookcase");
    root.push_attribute(("format", CATALOG_FORMAT_VERSION));
    writer.write_event(Event::Start(root))?;

    for book in books {
        let mut elem = BytesStart::new("book");
        elem.push_attribute(("uid", book.uid.to_string().as_str()));
        elem.push_attribute(("revision", book.revision.to_string().as_str()));
        elem.push_attribute(("state", state_name(book.state)));
        writer.write_event(Event::Start(elem))?;

        write_text_element(&mut writer, "title", &book.title)?;
        write_text_element(&mut writer, "author", &book.author)?;
        write_text_element(&mut writer, "publisher", &book.publisher)?;
        write_text_element(&mut writer, "year", &book.year)?;
        write_text_element(&mut writer, "cover", &book.cover)?;

        writer.write_event(Event::End(BytesEnd::new("book")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("bookcase")))?;
    Ok(writer.into_inner().into_inner())
}

/// Deserializes a catalog document into its record list.
///
/// Unknown elements are skipped; a missing or unparsable identity,
/// revision, or state is a [`StorageError::Format`].
pub fn decode_catalog(bytes: &[u8]) -> StorageResult<Vec<BookRecord>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|err| StorageError::Format(format!("catalog is not UTF-8: {err}")))?;

    let mut reader = Reader::from_str(text);
    let mut buf = Vec::new();

    let mut books = Vec::new();
    let mut current: Option<BookRecord> = None;
    let mut field = Field::None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"bookcase" => check_format(&e)?,
                b"book" => current = Some(book_from_attributes(&e)?),
                name => {
                    field = if current.is_some() {
                        Field::from_name(name)
                    } else {
                        Field::None
                    };
                }
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"bookcase" => check_format(&e)?,
                // A childless book element is a record with empty fields.
                b"book" => books.push(book_from_attributes(&e)?),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let Some(book) = current.as_mut() {
                    let value = e
                        .unescape()
                        .map_err(|err| StorageError::Format(err.to_string()))?;
                    field.assign(book, &value);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"book" => {
                    if let Some(book) = current.take() {
                        books.push(book);
                    }
                }
                b"bookcase" => {}
                _ => field = Field::None,
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(StorageError::Format(err.to_string())),
        }
        buf.clear();
    }

    if current.is_some() {
        return Err(StorageError::Format("unterminated book element".to_string()));
    }

    Ok(books)
}

/// File-backed catalog store holding the local XML document.
pub struct XmlCatalogFile {
    path: PathBuf,
}

impl XmlCatalogFile {
    /// Creates a store addressing the document at `path`.
    ///
    /// The file is not touched until the first load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the catalog, degrading to empty on any failure.
    ///
    /// A missing file is the ordinary first run and logs at info level; a
    /// malformed or unreadable file logs as an error. Neither aborts the
    /// caller.
    pub fn load_or_empty(&mut self) -> Vec<BookRecord> {
        match self.load() {
            Ok(books) => books,
            Err(StorageError::NotFound) => {
                info!("catalog file {:?} not found, starting empty", self.path);
                Vec::new()
            }
            Err(err) => {
                error!("failed to load catalog {:?}: {err:?}", self.path);
                Vec::new()
            }
        }
    }
}

impl CatalogStore for XmlCatalogFile {
    fn load(&mut self) -> StorageResult<Vec<BookRecord>> {
        let bytes = fs::read(&self.path)?;
        decode_catalog(&bytes)
    }

    fn save(&mut self, books: &[BookRecord]) -> StorageResult<()> {
        let bytes = encode_catalog(books)?;
        // NotFound belongs to the load taxonomy; any write failure is Io.
        fs::write(&self.path, bytes).map_err(StorageError::Io)
    }
}

enum Field {
    None,
    Title,
    Author,
    Publisher,
    Year,
    Cover,
}

impl Field {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"title" => Self::Title,
            b"author" => Self::Author,
            b"publisher" => Self::Publisher,
            b"year" => Self::Year,
            b"cover" => Self::Cover,
            _ => Self::None,
        }
    }

    fn assign(&self, book: &mut BookRecord, value: &str) {
        // Append rather than replace so split text events accumulate.
        match self {
            Self::Title => book.title.push_str(value),
            Self::Author => book.author.push_str(value),
            Self::Publisher => book.publisher.push_str(value),
            Self::Year => book.year.push_str(value),
            Self::Cover => book.cover.push_str(value),
            Self::None => {}
        }
    }
}

fn state_name(state: BookState) -> &'static str {
    match state {
        BookState::Active => "active",
        BookState::Deleted => "deleted",
    }
}

fn state_from_name(name: &str) -> StorageResult<BookState> {
    match name {
        "active" => Ok(BookState::Active),
        "deleted" => Ok(BookState::Deleted),
        other => Err(StorageError::Format(format!("unknown book state: {other}"))),
    }
}

fn check_format(e: &BytesStart<'_>) -> StorageResult<()> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| StorageError::Format(err.to_string()))?;
        if attr.key.as_ref() == b"format" {
            let value = attr
                .unescape_value()
                .map_err(|err| StorageError::Format(err.to_string()))?;
            if value != CATALOG_FORMAT_VERSION {
                return Err(StorageError::Format(format!(
                    "unsupported catalog format: {value}"
                )));
            }
        }
    }
    Ok(())
}

fn book_from_attributes(e: &BytesStart<'_>) -> StorageResult<BookRecord> {
    let mut uid: Option<BookUid> = None;
    let mut revision = 0;
    let mut state = BookState::Active;

    for attr in e.attributes() {
        let attr = attr.map_err(|err| StorageError::Format(err.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|err| StorageError::Format(err.to_string()))?;
        match attr.key.as_ref() {
            b"uid" => {
                let parsed = BookUid::parse_str(&value)
                    .map_err(|err| StorageError::Format(format!("bad book uid: {err}")))?;
                uid = Some(parsed);
            }
            b"revision" => {
                revision = value
                    .parse()
                    .map_err(|err| StorageError::Format(format!("bad book revision: {err}")))?;
            }
            b"state" => state = state_from_name(&value)?,
            _ => {}
        }
    }

    let uid = uid.ok_or_else(|| StorageError::Format("book element without uid".to_string()))?;

    Ok(BookRecord {
        uid,
        title: String::new(),
        author: String::new(),
        publisher: String::new(),
        year: String::new(),
        cover: String::new(),
        revision,
        state,
    })
}

fn write_text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    value: &str,
) -> StorageResult<()> {
    // An empty value must be a childless element: the indenting writer
    // would otherwise pad <name></name> with whitespace that the decoder
    // could not tell apart from content.
    if value.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(name)))?;
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
