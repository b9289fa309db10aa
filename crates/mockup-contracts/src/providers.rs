pub trait NamedProvider {
    fn name(&self) -> &str;
}

/// Providers in registration order, looked up by name.
#[derive(Debug, Clone)]
pub struct ProviderRegistry<T: NamedProvider> {
    providers: Vec<T>,
}

impl<T: NamedProvider> ProviderRegistry<T> {
    pub fn new(providers: Vec<T>) -> Self {
        Self { providers }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        let wanted = name.trim();
        self.providers
            .iter()
            .find(|provider| provider.name().eq_ignore_ascii_case(wanted))
    }

    pub fn list(&self) -> Vec<String> {
        let mut names = self
            .providers
            .iter()
            .map(|provider| provider.name().to_string())
            .collect::<Vec<String>>();
        names.sort();
        names
    }

    pub fn providers(&self) -> &[T] {
        self.providers.as_slice()
    }
}

impl<T: NamedProvider + ?Sized> NamedProvider for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }
}
