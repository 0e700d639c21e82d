use super::Principal;
use crate::models::BlogPost;

/// can_mutate_post
///
/// Ownership policy for updating or deleting a post: admins may mutate any post, authors
/// only posts whose author snapshot carries their id. The snapshot's display fields may
/// be stale; only the id matters here.
pub fn can_mutate_post(actor: &Principal, post: &BlogPost) -> bool {
    match actor {
        Principal::Admin(_) => true,
        Principal::Author(author) => author.id == post.author.id,
    }
}
