use log::{LevelFilter, Metadata, Record};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, OnceLock};

static G_LOGGER: OnceLock<Logger> = OnceLock::new();

const G_CONSOLE: &str = "console";
const G_FILE: &str = "file";

/// a simple sync logger which impl log::Log
///
/// console output goes to stderr, stdout belongs to the program's own report
pub struct Logger {
    sink: Mutex<Vec<Box<dyn Sink>>>,
}

trait Sink: Send {
    fn sink(&mut self, line: &str);

    fn flush(&mut self);

    fn name(&self) -> &'static str;
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let s = format!(
            "{} [{}] {}:{} {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S.%6f"),
            record.level().as_str(),
            record.file().unwrap_or("?"),
            record.line().unwrap_or(0),
            record.args()
        );
        for p in self.lock().iter_mut() {
            p.sink(&s);
        }
    }

    fn flush(&self) {
        for p in self.lock().iter_mut() {
            p.flush();
        }
    }
}

struct Console;

/// NOTE: file rolling is not support at present
struct File {
    w: std::fs::File,
}

impl File {
    fn new(path: impl AsRef<Path>, trunc: bool) -> Result<Self, std::io::Error> {
        let mut ops = std::fs::File::options();
        ops.write(true).create(true);
        if trunc {
            ops.truncate(true);
        } else {
            ops.append(true);
        }
        ops.open(path).map(|w| Self { w })
    }
}

impl Sink for Console {
    fn sink(&mut self, line: &str) {
        // a closed stderr must not take the program down
        let _ = std::io::stderr().write_all(line.as_bytes());
    }

    fn flush(&mut self) {
        let _ = std::io::stderr().flush();
    }

    fn name(&self) -> &'static str {
        G_CONSOLE
    }
}

impl Sink for File {
    fn sink(&mut self, line: &str) {
        let _ = self.w.write_all(line.as_bytes());
    }

    fn flush(&mut self) {
        let _ = self.w.flush();
    }

    fn name(&self) -> &'static str {
        G_FILE
    }
}

impl Logger {
    /// install the global logger once, later calls return the same instance
    pub fn init() -> &'static Self {
        let mut fresh = false;
        let l = G_LOGGER.get_or_init(|| {
            fresh = true;
            Self {
                sink: Mutex::new(Vec::new()),
            }
        });
        if fresh && log::set_logger(l).is_ok() {
            log::set_max_level(LevelFilter::Info);
        }
        l
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Box<dyn Sink>>> {
        // a panic while logging leaves the sinks usable
        self.sink.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn exist(&self, name: &'static str) -> bool {
        self.lock().iter().any(|x| x.name() == name)
    }

    pub fn level(&self, level: LevelFilter) -> &Self {
        log::set_max_level(level);
        self
    }

    pub fn add_console(&self) -> &Self {
        if !self.exist(G_CONSOLE) {
            self.lock().push(Box::new(Console));
        }
        self
    }

    pub fn add_file(&self, path: impl AsRef<Path>, trunc: bool) -> Result<&Self, std::io::Error> {
        if !self.exist(G_FILE) {
            let f = File::new(&path, trunc)?;
            self.lock().push(Box::new(f));
        }
        Ok(self)
    }

    fn remove_impl(&self, name: &'static str) {
        let mut sink = self.lock();
        if let Some(idx) = sink.iter().position(|s| s.name() == name) {
            sink.remove(idx).flush();
        }
    }

    pub fn remove_console(&self) {
        self.remove_impl(G_CONSOLE);
    }
}
