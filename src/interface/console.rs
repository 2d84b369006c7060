//! Console front end
//!
//! Numbered menus on stdout, line input on stdin <-> application::LibraryService
//!
//! Sections: main, book manager, reader manager, lending, files, app

use std::io::{self, BufRead, Write};

use crate::application::error::AppError;
use crate::application::service::LibraryService;
use crate::config::Config;
use crate::domain::error::DomainError;
use crate::domain::model::id::{BookId, ReaderId};
use crate::domain::model::library::{AddBookRequest, AddReaderRequest, Library};
use crate::domain::model::reader::Reader;
use crate::domain::repository::LibraryRepository;
use crate::infra::json_store::JsonLibraryRepository;

// =============================================================================
// Public entry point
// =============================================================================

/// Runs the interactive session on stdin/stdout until the user exits.
pub fn run(config: &Config) -> anyhow::Result<()> {
    let repo = JsonLibraryRepository::new(config.books_path(), config.readers_path());
    tracing::debug!(
        books = %repo.books_path().display(),
        readers = %repo.readers_path().display(),
        "starting console"
    );
    let stdin = io::stdin();
    let stdout = io::stdout();
    Console::new(LibraryService::new(repo), stdin.lock(), stdout.lock()).run()
}

// =============================================================================
// Menu table
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Main,
    Books,
    Readers,
    Lending,
    Files,
    App,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Goto(Section),
    Quit,
    AddBook,
    ShowBooks,
    ShowAvailableBooks,
    PopularBooks,
    RemoveBook,
    AddReader,
    ShowReaders,
    RemoveReader,
    GiveBook,
    ReturnBook,
    FindReaderByName,
    FindReaderByBookTitle,
    FindBooksByTitle,
    FindBooksByAuthor,
    SaveBooks,
    SaveReaders,
    LoadAll,
    SaveAndExit,
}

const ACTIONS: &[(Section, u8, Action)] = &[
    (Section::Main, 1, Action::Goto(Section::Books)),
    (Section::Main, 2, Action::Goto(Section::Readers)),
    (Section::Main, 3, Action::Goto(Section::Lending)),
    (Section::Main, 4, Action::Goto(Section::Files)),
    (Section::Main, 5, Action::Goto(Section::App)),
    (Section::Main, 0, Action::Quit),
    (Section::Books, 1, Action::AddBook),
    (Section::Books, 2, Action::ShowBooks),
    (Section::Books, 3, Action::ShowAvailableBooks),
    (Section::Books, 4, Action::PopularBooks),
    (Section::Books, 5, Action::RemoveBook),
    (Section::Books, 0, Action::Goto(Section::Main)),
    (Section::Readers, 1, Action::AddReader),
    (Section::Readers, 2, Action::ShowReaders),
    (Section::Readers, 3, Action::RemoveReader),
    (Section::Readers, 0, Action::Goto(Section::Main)),
    (Section::Lending, 1, Action::GiveBook),
    (Section::Lending, 2, Action::ReturnBook),
    (Section::Lending, 3, Action::FindReaderByName),
    (Section::Lending, 4, Action::FindReaderByBookTitle),
    (Section::Lending, 5, Action::FindBooksByTitle),
    (Section::Lending, 6, Action::FindBooksByAuthor),
    (Section::Lending, 0, Action::Goto(Section::Main)),
    (Section::Files, 1, Action::SaveBooks),
    (Section::Files, 2, Action::SaveReaders),
    (Section::Files, 3, Action::LoadAll),
    (Section::Files, 0, Action::Goto(Section::Main)),
    (Section::App, 1, Action::SaveAndExit),
    (Section::App, 0, Action::Goto(Section::Main)),
];

fn lookup(section: Section, code: u8) -> Option<Action> {
    ACTIONS
        .iter()
        .find(|(s, c, _)| *s == section && *c == code)
        .map(|(_, _, a)| *a)
}

const MAIN_MENU: &[&str] = &[
    "1. Book Manager",
    "2. Reader Manager",
    "3. Reader & Book Manager",
    "4. File Manager",
    "5. App",
    "0. Exit",
];

const BOOKS_MENU: &[&str] = &[
    "1. Add Book",
    "2. Show Books",
    "3. Show Available Books",
    "4. Most Popular Books",
    "5. Remove Book (by Id)",
    "0. Back",
];

const READERS_MENU: &[&str] = &[
    "1. Add Reader",
    "2. Show Readers",
    "3. Remove Reader (by Id)",
    "0. Back",
];

const LENDING_MENU: &[&str] = &[
    "1. Give Book to Reader",
    "2. Return Book from Reader",
    "3. Find Reader (by Name)",
    "4. Find Reader (by Book Title)",
    "5. Find Book (by Title)",
    "6. Find Book (by Author)",
    "0. Back",
];

const FILES_MENU: &[&str] = &[
    "1. Save All Books",
    "2. Save All Readers",
    "3. Load All Data",
    "0. Back",
];

const APP_MENU: &[&str] = &["1. Save & Exit", "0. Back"];

fn menu_lines(section: Section) -> (&'static str, &'static [&'static str]) {
    match section {
        Section::Main => ("BookBro", MAIN_MENU),
        Section::Books => ("Book Manager", BOOKS_MENU),
        Section::Readers => ("Reader Manager", READERS_MENU),
        Section::Lending => ("Reader & Book Manager", LENDING_MENU),
        Section::Files => ("File Manager", FILES_MENU),
        Section::App => ("App", APP_MENU),
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Number of entries in the popularity report.
pub const POPULAR_LIMIT: usize = 5;

pub fn write_popular_report(library: &Library, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Popular Books Report")?;
    writeln!(out)?;
    let popular = library.popular_books(POPULAR_LIMIT);
    if popular.is_empty() {
        return writeln!(out, "No data available.");
    }
    for (i, b) in popular.iter().enumerate() {
        writeln!(
            out,
            "{}. {} ({}) by {} - taken {} times",
            i + 1,
            b.title(),
            b.year(),
            b.author(),
            b.times_taken()
        )?;
    }
    Ok(())
}

/// "(Free)", "(Reading: <title>)" or "(Reading: unknown book)".
pub fn reader_status(library: &Library, reader: &Reader) -> String {
    if !reader.is_active() {
        return "(Free)".to_string();
    }
    match library.active_book_of(reader) {
        Some(book) => format!("(Reading: {})", book.title()),
        None => "(Reading: unknown book)".to_string(),
    }
}

// =============================================================================
// Console session
// =============================================================================

enum Selection {
    Back,
    Index(usize),
    Invalid,
}

/// One interactive session. The return-confirmation flag lives only here.
pub struct Console<R: LibraryRepository, I: BufRead, O: Write> {
    service: LibraryService<R>,
    input: I,
    out: O,
    section: Section,
    confirm_return: bool,
}

impl<R: LibraryRepository, I: BufRead, O: Write> Console<R, I, O> {
    pub fn new(service: LibraryService<R>, input: I, out: O) -> Self {
        Self {
            service,
            input,
            out,
            section: Section::Main,
            confirm_return: true,
        }
    }

    /// Loads persisted data, runs the menu loop and saves on exit.
    /// End of input counts as exit.
    pub fn run(mut self) -> anyhow::Result<()> {
        self.load_all()?;

        match self.menu_loop() {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                tracing::debug!("input closed");
            }
            Err(e) => return Err(e.into()),
        }

        self.service.save_all()?;
        for resource in self.service.unloaded() {
            writeln!(
                self.out,
                "The {resource} file could not be loaded and was left unchanged."
            )?;
        }
        tracing::info!("library saved on exit");
        Ok(())
    }

    fn menu_loop(&mut self) -> io::Result<()> {
        loop {
            self.draw_menu()?;
            let line = self.prompt("> ")?;
            let Ok(code) = line.trim().parse::<u8>() else {
                continue;
            };
            let Some(action) = lookup(self.section, code) else {
                continue;
            };
            match action {
                Action::Goto(section) => self.section = section,
                Action::Quit => return Ok(()),
                Action::SaveAndExit => {
                    writeln!(self.out, "Saving all data. Exiting...")?;
                    return Ok(());
                }
                other => self.dispatch(other)?,
            }
        }
    }

    fn dispatch(&mut self, action: Action) -> io::Result<()> {
        writeln!(self.out)?;
        match action {
            Action::AddBook => self.add_book(),
            Action::ShowBooks => self.show_books(false),
            Action::ShowAvailableBooks => self.show_books(true),
            Action::PopularBooks => write_popular_report(self.service.library(), &mut self.out),
            Action::RemoveBook => self.remove_book(),
            Action::AddReader => self.add_reader(),
            Action::ShowReaders => self.show_readers(),
            Action::RemoveReader => self.remove_reader(),
            Action::GiveBook => self.give_book(),
            Action::ReturnBook => self.return_book(),
            Action::FindReaderByName => self.find_readers_by_name(),
            Action::FindReaderByBookTitle => self.find_readers_by_book_title(),
            Action::FindBooksByTitle => self.find_books(true),
            Action::FindBooksByAuthor => self.find_books(false),
            Action::SaveBooks => self.save(action),
            Action::SaveReaders => self.save(action),
            Action::LoadAll => self.reload(),
            Action::Goto(_) | Action::Quit | Action::SaveAndExit => Ok(()),
        }
    }

    fn draw_menu(&mut self) -> io::Result<()> {
        let (title, items) = menu_lines(self.section);
        writeln!(self.out)?;
        writeln!(self.out, "{title}")?;
        writeln!(self.out)?;
        for item in items {
            writeln!(self.out, "{item}")?;
        }
        Ok(())
    }

    // --- Input helpers ---

    fn prompt(&mut self, label: &str) -> io::Result<String> {
        write!(self.out, "{label}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn prompt_non_empty(&mut self, label: &str) -> io::Result<String> {
        loop {
            let value = self.prompt(label)?;
            if !value.trim().is_empty() {
                return Ok(value.trim().to_string());
            }
        }
    }

    fn select(&mut self, label: &str, count: usize) -> io::Result<Selection> {
        let line = self.prompt(label)?;
        Ok(match line.trim().parse::<usize>() {
            Ok(0) => Selection::Back,
            Ok(n) if n <= count => Selection::Index(n - 1),
            _ => Selection::Invalid,
        })
    }

    // --- Book manager ---

    fn add_book(&mut self) -> io::Result<()> {
        let title = self.prompt_non_empty("Title: ")?;
        let author = self.prompt_non_empty("Author: ")?;
        let year = loop {
            match self.prompt("Year: ")?.trim().parse::<i32>() {
                Ok(year) if year != 0 => break year,
                _ => writeln!(self.out, "Year must be a non-zero number")?,
            }
        };

        let id = self.service.add_book(AddBookRequest {
            title: title.clone(),
            author: author.clone(),
            year,
        });
        writeln!(
            self.out,
            "Book {title} by {author} was added to library. Id: {id}"
        )
    }

    fn show_books(&mut self, only_available: bool) -> io::Result<()> {
        let library = self.service.library();
        let books: Vec<_> = if only_available {
            library.available_books()
        } else {
            library.books().iter().collect()
        };

        if books.is_empty() {
            let msg = if only_available {
                "No available books found"
            } else {
                "No books found"
            };
            return writeln!(self.out, "{msg}");
        }

        for b in books {
            let status = match (only_available, b.is_available()) {
                (true, _) => "",
                (false, true) => " (Available)",
                (false, false) => " (Taken)",
            };
            writeln!(
                self.out,
                "{} - {} ({}) by {}{}",
                b.id(),
                b.title(),
                b.year(),
                b.author(),
                status
            )?;
        }
        Ok(())
    }

    fn remove_book(&mut self) -> io::Result<()> {
        let input = self.prompt("Enter Book Id: ")?;
        let id: BookId = match input.parse() {
            Ok(id) => id,
            Err(_) => return writeln!(self.out, "Invalid Id format"),
        };
        match self.service.remove_book(id) {
            Ok(book) => writeln!(self.out, "Book {} removed", book.title()),
            Err(AppError::Domain(DomainError::BookNotFound(_))) => {
                writeln!(self.out, "Book not found")
            }
            Err(AppError::Domain(DomainError::BookOnLoan(_))) => {
                writeln!(self.out, "Book is checked out; return it first")
            }
            Err(e) => writeln!(self.out, "Could not remove book: {e}"),
        }
    }

    // --- Reader manager ---

    fn add_reader(&mut self) -> io::Result<()> {
        let name = self.prompt("Reader Full Name: ")?;
        if name.trim().is_empty() {
            return writeln!(self.out, "Reader name cannot be empty");
        }
        let phone = self.prompt("Phone (optional): ")?;
        let phone = Some(phone.trim().to_string()).filter(|p| !p.is_empty());

        let name = name.trim().to_string();
        let id = self.service.add_reader(AddReaderRequest {
            full_name: name.clone(),
            phone,
        });
        writeln!(self.out, "Reader {name} was added. Id: {id}")
    }

    fn show_readers(&mut self) -> io::Result<()> {
        let library = self.service.library();
        if library.readers().is_empty() {
            return writeln!(self.out, "No readers found");
        }
        for r in library.readers() {
            writeln!(
                self.out,
                "{} - {} {}",
                r.id(),
                r.full_name(),
                reader_status(library, r)
            )?;
        }
        Ok(())
    }

    fn remove_reader(&mut self) -> io::Result<()> {
        let input = self.prompt("Enter Reader Id: ")?;
        let id: ReaderId = match input.parse() {
            Ok(id) => id,
            Err(_) => return writeln!(self.out, "Invalid Id format"),
        };
        match self.service.remove_reader(id) {
            Ok(reader) => writeln!(self.out, "Reader {} removed", reader.full_name()),
            Err(AppError::Domain(DomainError::ReaderNotFound(_))) => {
                writeln!(self.out, "Reader not found")
            }
            Err(e) => writeln!(self.out, "Could not remove reader: {e}"),
        }
    }

    fn find_readers_by_name(&mut self) -> io::Result<()> {
        let query = self.prompt("Enter name part: ")?;
        let library = self.service.library();
        let results = library.find_readers_by_name(&query);
        if results.is_empty() {
            return writeln!(self.out, "No readers found by name");
        }
        for r in results {
            writeln!(
                self.out,
                "{} - {} {}",
                r.id(),
                r.full_name(),
                reader_status(library, r)
            )?;
        }
        Ok(())
    }

    fn find_readers_by_book_title(&mut self) -> io::Result<()> {
        let query = self.prompt("Enter book title part: ")?;
        let library = self.service.library();
        let results = library.find_readers_by_book_title(&query);
        if results.is_empty() {
            return writeln!(self.out, "No readers found with that book");
        }
        for r in results {
            writeln!(
                self.out,
                "{} - {} {}",
                r.id(),
                r.full_name(),
                reader_status(library, r)
            )?;
        }
        Ok(())
    }

    fn find_books(&mut self, by_title: bool) -> io::Result<()> {
        let (label, empty) = if by_title {
            ("Enter title part: ", "No books found by title")
        } else {
            ("Enter author part: ", "No books found by author")
        };
        let query = self.prompt(label)?;
        let library = self.service.library();
        let results = if by_title {
            library.find_books_by_title(&query)
        } else {
            library.find_books_by_author(&query)
        };
        if results.is_empty() {
            return writeln!(self.out, "{empty}");
        }
        for b in results {
            writeln!(self.out, "{} - {} by {}", b.id(), b.title(), b.author())?;
        }
        Ok(())
    }

    // --- Lending ---

    fn give_book(&mut self) -> io::Result<()> {
        loop {
            writeln!(self.out, "Give Book to Reader")?;
            writeln!(self.out, "----------------------")?;

            let library = self.service.library();
            let readers: Vec<(ReaderId, String)> = library
                .free_readers()
                .iter()
                .map(|r| (r.id(), r.full_name().to_string()))
                .collect();
            let books: Vec<(BookId, String)> = library
                .available_books()
                .iter()
                .map(|b| (b.id(), format!("{} by {}", b.title(), b.author())))
                .collect();

            if library.readers().is_empty() {
                return writeln!(self.out, "No readers found.");
            }
            if books.is_empty() {
                return writeln!(self.out, "No available books to give.");
            }
            if readers.is_empty() {
                return writeln!(self.out, "No free readers available.");
            }

            writeln!(self.out, "\nAvailable Readers:")?;
            for (i, (_, name)) in readers.iter().enumerate() {
                writeln!(self.out, "{}. {}", i + 1, name)?;
            }
            let (reader_id, reader_name) =
                match self.select("\nSelect reader by number (0 = back): ", readers.len())? {
                    Selection::Back => return Ok(()),
                    Selection::Invalid => {
                        writeln!(self.out, "Invalid reader selection.")?;
                        continue;
                    }
                    Selection::Index(i) => readers[i].clone(),
                };

            loop {
                writeln!(self.out, "\nAvailable Books for {reader_name}:")?;
                for (i, (_, label)) in books.iter().enumerate() {
                    writeln!(self.out, "{}. {}", i + 1, label)?;
                }
                let book_id =
                    match self.select("\nSelect book by number (0 = back): ", books.len())? {
                        Selection::Back => break,
                        Selection::Invalid => {
                            writeln!(self.out, "Invalid book selection.")?;
                            continue;
                        }
                        Selection::Index(i) => books[i].0,
                    };

                return match self.service.checkout(reader_id, book_id) {
                    Ok(()) => {
                        let title = self
                            .service
                            .library()
                            .get_book(book_id)
                            .map(|b| b.title().to_string())
                            .unwrap_or_default();
                        writeln!(
                            self.out,
                            "\nBook \"{title}\" was successfully given to {reader_name}!"
                        )
                    }
                    Err(e) => writeln!(self.out, "\nCould not give book: {e}"),
                };
            }
        }
    }

    fn return_book(&mut self) -> io::Result<()> {
        loop {
            writeln!(self.out, "Return Book from Reader")?;
            writeln!(self.out, "--------------------------")?;

            let library = self.service.library();
            let active: Vec<(ReaderId, String, String)> = library
                .readers_with_books()
                .iter()
                .map(|r| {
                    let title = library
                        .active_book_of(r)
                        .map(|b| b.title().to_string())
                        .unwrap_or_default();
                    (r.id(), r.full_name().to_string(), title)
                })
                .collect();

            if active.is_empty() {
                return writeln!(self.out, "No readers currently have books.");
            }

            writeln!(self.out, "\nReaders with books:")?;
            for (i, (_, name, title)) in active.iter().enumerate() {
                writeln!(self.out, "{}. {} - {}", i + 1, name, title)?;
            }

            let (reader_id, name, title) =
                match self.select("\nSelect reader by number (0 = back): ", active.len())? {
                    Selection::Back => return Ok(()),
                    Selection::Invalid => {
                        writeln!(self.out, "Invalid selection.")?;
                        continue;
                    }
                    Selection::Index(i) => active[i].clone(),
                };

            if self.confirm_return {
                writeln!(
                    self.out,
                    "\nYou are about to return \"{title}\" from {name}."
                )?;
                writeln!(self.out, "Are you sure?")?;
                writeln!(self.out)?;
                writeln!(self.out, "1. OK")?;
                writeln!(self.out, "2. No")?;
                writeln!(self.out, "3. OK, but never ask again")?;
                match self.prompt("\nChoose action: ")?.trim() {
                    "1" => {}
                    "2" => {
                        writeln!(self.out, "\nCancelled.")?;
                        continue;
                    }
                    "3" => {
                        self.confirm_return = false;
                        writeln!(self.out, "\nConfirmation disabled for this session.")?;
                    }
                    _ => {
                        writeln!(self.out, "\nInvalid choice.")?;
                        continue;
                    }
                }
            }

            match self.service.return_book(reader_id) {
                Ok(_) => writeln!(
                    self.out,
                    "\nBook \"{title}\" successfully returned from {name}."
                )?,
                Err(e) => writeln!(self.out, "\nCould not return book: {e}")?,
            }
        }
    }

    // --- Files ---

    fn save(&mut self, action: Action) -> io::Result<()> {
        let (result, done) = match action {
            Action::SaveReaders => (self.service.save_readers(), "Readers saved"),
            _ => (self.service.save_books(), "Books saved"),
        };
        match result {
            Ok(()) => writeln!(self.out, "{done}"),
            Err(e) => {
                tracing::error!(error = %e, "save failed");
                writeln!(self.out, "Save failed: {e}")
            }
        }
    }

    /// Load All from the file menu. Asks first when in-memory changes
    /// would be discarded.
    fn reload(&mut self) -> io::Result<()> {
        if self.service.has_unsaved_changes() {
            writeln!(self.out, "Unsaved changes will be lost.")?;
            writeln!(self.out)?;
            writeln!(self.out, "1. Load anyway")?;
            writeln!(self.out, "0. Cancel")?;
            if self.prompt("\nChoose action: ")?.trim() != "1" {
                return writeln!(self.out, "\nCancelled.");
            }
        }
        self.load_all()
    }

    fn load_all(&mut self) -> io::Result<()> {
        let report = self.service.load_all();
        for failure in &report.failures {
            writeln!(self.out, "Could not load data: {failure}")?;
        }
        if !report.dangling.is_empty() {
            writeln!(
                self.out,
                "{} reader(s) hold a book missing from the catalog",
                report.dangling.len()
            )?;
        }
        for reader in &report.contested {
            writeln!(
                self.out,
                "Reader {reader} claims a book another reader holds; loan ignored"
            )?;
        }
        if !report.orphaned.is_empty() {
            writeln!(
                self.out,
                "{} book(s) marked as taken but held by no reader:",
                report.orphaned.len()
            )?;
            for id in &report.orphaned {
                if let Some(book) = self.service.library().get_book(*id) {
                    writeln!(self.out, "  {} ({})", book.title(), id.short())?;
                }
            }
        }
        writeln!(
            self.out,
            "Loaded {} books and {} readers",
            report.books, report.readers
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
