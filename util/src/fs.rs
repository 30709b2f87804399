//! Filesystem operations whose errors remember which path they were about.

pub use path::Path;
pub use path::PathBuf;
pub mod path {
    pub use std::path::Path;
    pub use std::path::PathBuf;

    pub use parent::parent;
    pub mod parent {
        pub fn parent(path: &fs::Path) -> Result<&fs::Path, Error> {
            path.parent()
                .ok_or_else(|| RootPath(path.into()))
                .map_err(|source| Error { source })
        }

        #[derive(Debug)]
        pub struct Error {
            pub source: RootPath,
        }

        impl Display for Error {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    "failed to find parent of path {}",
                    self.source.0.display()
                )
            }
        }

        impl std::error::Error for Error {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.source)
            }
        }

        #[derive(Debug)]
        pub struct RootPath(pub Box<fs::Path>);

        impl Display for RootPath {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "path {} ends in a prefix or root", self.0.display())
            }
        }

        impl std::error::Error for RootPath {}

        use crate::fs;
        use std::fmt;
        use std::fmt::Display;
        use std::fmt::Formatter;
    }
}

pub use create_dir_all::create_dir_all;
pub mod create_dir_all {
    /// Creates `path` and its missing ancestors, readable only by the owner.
    pub fn create_dir_all(path: &fs::Path) -> Result<(), Error> {
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(path)
            .map_err(|source| Error {
                path: path.into(),
                source,
            })
    }

    #[derive(Debug)]
    pub struct Error {
        pub path: Box<fs::Path>,
        pub source: io::Error,
    }

    impl Display for Error {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "failed to create directory {}", self.path.display())
        }
    }

    impl std::error::Error for Error {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.source)
        }
    }

    use crate::fs;
    use std::fmt;
    use std::fmt::Display;
    use std::fmt::Formatter;
    use std::io;
    use std::os::unix::fs::DirBuilderExt as _;
}

pub use rename::rename;
pub mod rename {
    pub fn rename(from: &fs::Path, to: &fs::Path) -> Result<(), Error> {
        std::fs::rename(from, to).map_err(|source| Error {
            from: from.into(),
            to: to.into(),
            source,
        })
    }

    #[derive(Debug)]
    pub struct Error {
        pub from: Box<fs::Path>,
        pub to: Box<fs::Path>,
        pub source: io::Error,
    }

    impl Display for Error {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(
                f,
                "failed to rename {} to {}",
                self.from.display(),
                self.to.display()
            )
        }
    }

    impl std::error::Error for Error {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.source)
        }
    }

    use crate::fs;
    use std::fmt;
    use std::fmt::Display;
    use std::fmt::Formatter;
    use std::io;
}

pub use file::File;
pub mod file {
    #[derive(Debug)]
    pub struct File<P: Borrow<fs::Path>> {
        std: std::fs::File,
        path: P,
    }

    impl<P: Borrow<fs::Path>> File<P> {
        pub fn path(&self) -> &fs::Path {
            self.path.borrow()
        }
        pub fn into_path(self) -> P {
            self.path
        }
    }

    impl<P: Borrow<fs::Path>> AsRawFd for File<P> {
        fn as_raw_fd(&self) -> RawFd {
            self.std.as_raw_fd()
        }
    }

    impl<P: Borrow<fs::Path>> io::Write for File<P> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.std
                .write(buf)
                .with_context(|| format!("failed to write to {}", self.path.borrow().display()))
        }
        fn flush(&mut self) -> io::Result<()> {
            self.std
                .sync_data()
                .with_context(|| format!("failed to sync {}", self.path.borrow().display()))
        }
    }

    impl<P: Borrow<fs::Path>> File<P> {
        fn read_context(&self) -> impl '_ + FnOnce() -> String {
            || format!("failed to read from {}", self.path.borrow().display())
        }
    }

    impl<P: Borrow<fs::Path>> io::Read for File<P> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.std.read(buf).with_context(self.read_context())
        }
        fn read_to_string(&mut self, buf: &mut String) -> io::Result<usize> {
            self.std
                .read_to_string(buf)
                .with_context(self.read_context())
        }
        fn read_to_end(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
            self.std.read_to_end(buf).with_context(self.read_context())
        }
    }

    pub use open::open;
    pub mod open {
        pub fn open<P: Borrow<fs::Path>>(path: P, options: Options) -> Result<fs::File<P>, Error> {
            let mut std_options = std::fs::OpenOptions::new();

            std_options.read(options.access.read());

            if let Some(options) = options.access.write_options() {
                std_options.write(true);
                match options {
                    WriteOptions::OpenOrCreate => std_options.create(true),
                    WriteOptions::CreateNew => std_options.create_new(true),
                };
            }

            if let Some(permissions) = options.permissions {
                std_options.mode(permissions);
            }

            let std_file = std_options.open(path.borrow()).map_err(|source| Error {
                path: path.borrow().into(),
                options,
                source,
            })?;

            Ok(fs::File {
                std: std_file,
                path,
            })
        }

        pub fn read_only<P: Borrow<fs::Path>>(path: P) -> Result<fs::File<P>, Error> {
            open(path, Options::from_access(Access::ReadOnly))
        }

        #[derive(Debug, Clone)]
        #[non_exhaustive]
        pub struct Options {
            pub access: Access,

            /// Unix permission bits applied if the file gets created.
            pub permissions: Option<u32>,
        }

        impl Options {
            #[must_use]
            pub fn from_access(access: Access) -> Self {
                Self {
                    access,
                    permissions: None,
                }
            }

            #[must_use]
            pub fn permissions(mut self, permissions: u32) -> Self {
                self.permissions = Some(permissions);
                self
            }
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Access {
            ReadOnly,
            WriteOnly(WriteOptions),
            ReadWrite(WriteOptions),
        }

        impl Access {
            #[must_use]
            pub fn read(&self) -> bool {
                matches!(self, Self::ReadOnly | Self::ReadWrite(_))
            }

            #[must_use]
            pub fn write_options(&self) -> Option<WriteOptions> {
                match *self {
                    Self::ReadOnly => None,
                    Self::WriteOnly(options) | Self::ReadWrite(options) => Some(options),
                }
            }
        }

        /// Existing contents are never truncated.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum WriteOptions {
            OpenOrCreate,
            CreateNew,
        }

        #[derive(Debug)]
        pub struct Error {
            pub path: Box<fs::Path>,
            pub options: Options,
            pub source: io::Error,
        }

        impl Error {
            #[must_use]
            pub fn is_not_found(&self) -> bool {
                self.source.kind() == io::ErrorKind::NotFound
            }
        }

        impl Display for Error {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("failed to ")?;
                let path = self.path.display();
                match self.options.access {
                    Access::ReadOnly => write!(f, "open {path} read-only"),
                    Access::WriteOnly(WriteOptions::OpenOrCreate)
                    | Access::ReadWrite(WriteOptions::OpenOrCreate) => write!(f, "open {path}"),
                    Access::WriteOnly(WriteOptions::CreateNew)
                    | Access::ReadWrite(WriteOptions::CreateNew) => write!(f, "create {path}"),
                }
            }
        }

        impl std::error::Error for Error {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.source)
            }
        }

        #[cfg(test)]
        mod tests {
            #[test]
            fn open_or_create_keeps_existing_contents() {
                let dir = tempfile::tempdir().unwrap();
                let path = dir.path().join("file");
                std::fs::write(&path, "kept").unwrap();

                let access = Access::ReadWrite(WriteOptions::OpenOrCreate);
                drop(open(&*path, Options::from_access(access)).unwrap());

                assert_eq!(std::fs::read(&path).unwrap(), b"kept");
            }

            #[test]
            fn create_new_refuses_existing_files() {
                let dir = tempfile::tempdir().unwrap();
                let path = dir.path().join("file");
                std::fs::write(&path, "").unwrap();

                let access = Access::WriteOnly(WriteOptions::CreateNew);
                let e = open(&*path, Options::from_access(access)).unwrap_err();

                assert_eq!(e.to_string(), format!("failed to create {}", path.display()));
                assert!(!e.is_not_found());
            }

            use super::open;
            use super::Access;
            use super::Options;
            use super::WriteOptions;
        }

        use crate::fs;
        use std::borrow::Borrow;
        use std::fmt;
        use std::fmt::Display;
        use std::fmt::Formatter;
        use std::io;
        use std::os::unix::fs::OpenOptionsExt as _;
    }

    use crate::fs;
    use crate::fs::io_error_context::Context as _;
    use std::borrow::Borrow;
    use std::io;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::io::RawFd;
}

pub use read::read;
pub mod read {
    pub fn read<P: Borrow<fs::Path>>(path: P) -> Result<Vec<u8>, Error> {
        let path = path.borrow();
        read_inner(path).map_err(|kind| Error {
            path: path.into(),
            kind,
        })
    }

    fn read_inner(path: &fs::Path) -> Result<Vec<u8>, ErrorKind> {
        let mut file = fs::file::open::read_only(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(ErrorKind::Read)?;
        Ok(bytes)
    }

    #[derive(Debug)]
    pub struct Error {
        pub path: Box<fs::Path>,
        pub kind: ErrorKind,
    }

    impl Error {
        /// Whether the file was simply absent.
        #[must_use]
        pub fn is_not_found(&self) -> bool {
            matches!(&self.kind, ErrorKind::Open(e) if e.is_not_found())
        }
    }

    impl Display for Error {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "failed to read file {}", self.path.display())
        }
    }

    impl std::error::Error for Error {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            match &self.kind {
                ErrorKind::Open(e) => Some(e),
                ErrorKind::Read(e) => Some(e),
            }
        }
    }

    #[derive(Debug)]
    pub enum ErrorKind {
        Open(fs::file::open::Error),
        Read(io::Error),
    }

    impl From<fs::file::open::Error> for ErrorKind {
        fn from(error: fs::file::open::Error) -> Self {
            Self::Open(error)
        }
    }

    use crate::fs;
    use std::borrow::Borrow;
    use std::fmt;
    use std::fmt::Display;
    use std::fmt::Formatter;
    use std::io;
    use std::io::Read as _;
}

pub use overwrite::Overwriter;
pub mod overwrite {
    //! Whole-file replacement through a temporary sibling and a rename, so readers see either
    //! the old contents or the new contents and nothing in between.

    pub struct Overwriter<P: Borrow<fs::Path>> {
        final_path: P,
        temp_file: fs::File<fs::PathBuf>,
    }

    impl<P: Borrow<fs::Path>> Overwriter<P> {
        /// Starts replacing `path`. The replacement gets the `permissions` mode bits; the parent
        /// directory must already exist.
        pub fn start(path: P, permissions: u32) -> Result<Self, StartError> {
            match start_inner(path.borrow(), permissions) {
                Ok(temp_file) => Ok(Self {
                    final_path: path,
                    temp_file,
                }),
                Err(kind) => Err(StartError {
                    path: path.borrow().into(),
                    kind,
                }),
            }
        }
    }

    fn start_inner(
        final_path: &fs::Path,
        permissions: u32,
    ) -> Result<fs::File<fs::PathBuf>, StartErrorKind> {
        let parent = fs::path::parent(final_path)?;

        let mut temp_filename = ".DELETE_ME_".to_owned();
        rand::distributions::Alphanumeric.append_string(
            &mut rand::thread_rng(),
            &mut temp_filename,
            20,
        );
        let temp_path = parent.join(temp_filename);
        let write_options = fs::file::open::WriteOptions::CreateNew;
        let access = fs::file::open::Access::WriteOnly(write_options);
        let open_options = fs::file::open::Options::from_access(access).permissions(permissions);
        let temp_file = fs::file::open(temp_path, open_options)?;

        Ok(temp_file)
    }

    #[derive(Debug)]
    pub struct StartError {
        pub path: Box<fs::Path>,
        pub kind: StartErrorKind,
    }

    impl Display for StartError {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "failed to overwrite {}", self.path.display())
        }
    }

    impl std::error::Error for StartError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            match &self.kind {
                StartErrorKind::PathParent(e) => Some(e),
                StartErrorKind::FileOpen(e) => Some(e),
            }
        }
    }

    #[derive(Debug)]
    pub enum StartErrorKind {
        PathParent(fs::path::parent::Error),
        FileOpen(fs::file::open::Error),
    }

    impl From<fs::path::parent::Error> for StartErrorKind {
        fn from(error: fs::path::parent::Error) -> Self {
            Self::PathParent(error)
        }
    }

    impl From<fs::file::open::Error> for StartErrorKind {
        fn from(error: fs::file::open::Error) -> Self {
            Self::FileOpen(error)
        }
    }

    impl<P: Borrow<fs::Path>> io::Write for Overwriter<P> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.temp_file.write(buf).with_context(|| {
                format!("failed to overwrite {}", self.final_path.borrow().display())
            })
        }
        fn flush(&mut self) -> io::Result<()> {
            self.temp_file.flush()
        }
    }

    impl<P: Borrow<fs::Path>> Overwriter<P> {
        pub fn finish(self) -> Result<(), FinishError> {
            let temp_path = self.temp_file.into_path();

            if let Err(source) = fs::rename(&*temp_path, self.final_path.borrow()) {
                drop(std::fs::remove_file(&*temp_path));
                return Err(FinishError {
                    path: self.final_path.borrow().into(),
                    source,
                });
            }

            Ok(())
        }

        /// Gives up, leaving the original file untouched.
        pub fn abort(self) {
            drop(std::fs::remove_file(self.temp_file.into_path()));
        }
    }

    #[derive(Debug)]
    pub struct FinishError {
        pub path: Box<fs::Path>,
        pub source: fs::rename::Error,
    }

    impl Display for FinishError {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "failed to overwrite {}", self.path.display())
        }
    }

    impl std::error::Error for FinishError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.source)
        }
    }

    pub fn with<P: Borrow<fs::Path>>(
        path: P,
        contents: &[u8],
        permissions: u32,
    ) -> Result<(), WithError> {
        (|| {
            let mut overwriter = Overwriter::start(path, permissions)?;
            if let Err(e) = overwriter
                .write_all(contents)
                .and_then(|()| overwriter.flush())
            {
                overwriter.abort();
                return Err(WithErrorKind::Write(e));
            }
            overwriter.finish()?;
            Ok(())
        })()
        .map_err(|kind| WithError { kind })
    }

    #[derive(Debug)]
    pub struct WithError {
        kind: WithErrorKind,
    }

    impl WithError {
        fn inner(&self) -> &(dyn 'static + std::error::Error) {
            match &self.kind {
                WithErrorKind::Start(e) => e,
                WithErrorKind::Write(e) => e,
                WithErrorKind::Finish(e) => e,
            }
        }
    }

    impl Display for WithError {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            Display::fmt(self.inner(), f)
        }
    }

    impl std::error::Error for WithError {
        fn source(&self) -> Option<&(dyn 'static + std::error::Error)> {
            self.inner().source()
        }
    }

    #[derive(Debug)]
    enum WithErrorKind {
        Start(StartError),
        Write(io::Error),
        Finish(FinishError),
    }

    impl From<StartError> for WithErrorKind {
        fn from(error: StartError) -> Self {
            WithErrorKind::Start(error)
        }
    }

    impl From<FinishError> for WithErrorKind {
        fn from(error: FinishError) -> Self {
            WithErrorKind::Finish(error)
        }
    }


    use crate::fs;
    use crate::fs::io_error_context::Context as _;
    use rand::distributions::DistString;
    use std::borrow::Borrow;
    use std::fmt;
    use std::fmt::Display;
    use std::fmt::Formatter;
    use std::io;
    use std::io::Write as _;
}

mod io_error_context {
    /// The I/O traits force `io::Error` as the error type, so context has to be smuggled inside
    /// one.
    pub(crate) fn io_error_context(error: io::Error, context: String) -> io::Error {
        io::Error::new(
            error.kind(),
            Wrapper {
                context,
                source: error,
            },
        )
    }

    #[derive(Debug)]
    struct Wrapper {
        context: String,
        source: io::Error,
    }

    impl Display for Wrapper {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            f.write_str(&*self.context)
        }
    }

    impl std::error::Error for Wrapper {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.source)
        }
    }

    pub(crate) trait Context {
        type Output;
        fn with_context<F: FnOnce() -> String>(self, f: F) -> io::Result<Self::Output>;
    }

    impl<T> Context for io::Result<T> {
        type Output = T;
        fn with_context<F: FnOnce() -> String>(self, f: F) -> io::Result<Self::Output> {
            self.map_err(|error| io_error_context(error, f()))
        }
    }

    use std::fmt;
    use std::fmt::Display;
    use std::fmt::Formatter;
    use std::io;
}
