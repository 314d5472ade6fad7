use clap::{Args, Parser, Subcommand};
use library_core::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "libcat")]
#[command(about = "Small library catalog: books, members and loans", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new book
    AddBook {
        #[arg(long)]
        isbn: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        year: i32,
    },

    /// Register a new member
    AddMember {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },

    /// Lend a book to a member
    Borrow {
        isbn: String,
        member_id: String,

        /// Loan period in days (defaults to lending.loan_days from config)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Take a book back from a member
    Return { isbn: String, member_id: String },

    /// Search titles and authors (case-insensitive)
    Search { query: String },

    /// List books
    List(ListFilter),

    /// Show catalog counts
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove every book and member
    Clear,
}

#[derive(Args)]
#[group(multiple = false)]
struct ListFilter {
    /// Only books on the shelf
    #[arg(long)]
    available: bool,

    /// Only books out on loan
    #[arg(long)]
    borrowed: bool,

    /// Only loans past their due date
    #[arg(long)]
    overdue: bool,
}

fn main() -> Result<()> {
    library_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());

    tracing::debug!("Using data directory {:?}", data_dir);
    let mut library = Library::open(&data_dir)?;

    match cli.command {
        Commands::AddBook {
            isbn,
            title,
            author,
            year,
        } => {
            // report only once the commit has succeeded
            let added = library.transaction(|lib| -> Result<String> {
                Ok(describe(lib.add_book(&isbn, &title, &author, year)?))
            })?;
            println!("✓ Added {}", added);
        }

        Commands::AddMember { id, name, email } => {
            let added = library.transaction(|lib| -> Result<String> {
                let member = lib.add_member(&id, &name, &email)?;
                Ok(format!("{} ({})", member.member_id(), member.name()))
            })?;
            println!("✓ Added member {}", added);
        }

        Commands::Borrow {
            isbn,
            member_id,
            days,
        } => {
            let days = days.unwrap_or(config.lending.loan_days);
            let borrowed = library.transaction(|lib| -> Result<String> {
                lib.borrow_book(&isbn, &member_id, days)?;
                Ok(describe(lib.get_book(&isbn)?))
            })?;
            println!("✓ {}", borrowed);
        }

        Commands::Return { isbn, member_id } => {
            let returned = library.transaction(|lib| -> Result<String> {
                lib.return_book(&isbn, &member_id)?;
                Ok(describe(lib.get_book(&isbn)?))
            })?;
            println!("✓ Returned {}", returned);
        }

        Commands::Search { query } => {
            let results = library.search(&query);
            if results.is_empty() {
                println!("No books match {:?}", query);
            }
            for book in results {
                println!("{}", describe(book));
            }
        }

        Commands::List(filter) => {
            let books: Vec<&Book> = if filter.available {
                library.available_books()
            } else if filter.borrowed {
                library.borrowed_books()
            } else if filter.overdue {
                library.overdue_books()
            } else {
                library.books().collect()
            };

            for book in books {
                println!("{}", describe(book));
            }
        }

        Commands::Stats { json } => {
            let stats = library.statistics();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Books:     {}", stats.total_books);
                println!("Available: {}", stats.available_books);
                println!("Borrowed:  {}", stats.borrowed_books);
                println!("Overdue:   {}", stats.overdue_books);
                println!("Members:   {}", stats.total_members);
            }
        }

        Commands::Clear => {
            library.clear()?;
            println!("✓ Catalog cleared");
        }
    }

    Ok(())
}

fn describe(book: &Book) -> String {
    let status = match (book.borrowed_by(), book.due_date()) {
        (Some(member_id), Some(due)) if book.is_overdue() => {
            format!("OVERDUE, borrowed by {}, due {}", member_id, due.format("%Y-%m-%d"))
        }
        (Some(member_id), Some(due)) => {
            format!("borrowed by {}, due {}", member_id, due.format("%Y-%m-%d"))
        }
        _ => "available".to_string(),
    };

    format!(
        "{}  {} by {} ({})  [{}]",
        book.isbn(),
        book.title(),
        book.author(),
        book.year(),
        status
    )
}
