use std::path::PathBuf;

/// Maps a logical font name such as `DejaVuSansBold` to a file.
pub trait ResourceResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Looks for `fonts/{name}.ttf`, then `fonts/{name}.otf`, under each root in order.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    roots: Vec<PathBuf>,
}

impl DirectoryResolver {
    pub const EXTENSIONS: [&'static str; 2] = ["ttf", "otf"];

    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        self.roots
            .iter()
            .flat_map(|root| {
                Self::EXTENSIONS
                    .iter()
                    .map(move |ext| root.join("fonts").join(format!("{name}.{ext}")))
            })
            .collect()
    }
}

impl ResourceResolver for DirectoryResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let found = self.candidates(name).into_iter().find(|p| p.is_file());
        if found.is_none() {
            log::debug!("no font file for {name} under {:?}", self.roots);
        }
        found
    }
}
