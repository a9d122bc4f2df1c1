use crate::navigation::Navigation;

pub trait NavigatorPort: Send + Sync {
    fn navigate(&self, navigation: Navigation);
}
