use surrealdb::sql::Thing;

/// Strips an optional `table:` prefix from an id.
pub fn parse_id_part(id: &str) -> &str {
    match id.split_once(':') {
        Some((_, id_part)) => id_part,
        None => id,
    }
}

pub fn create_thing(table: &str, id: &str) -> Thing {
    let clean_id = parse_id_part(id);
    Thing::from((table.to_string(), clean_id.to_string()))
}

pub fn create_user_thing(user_id: &str) -> Thing {
    create_thing("user", user_id)
}

pub fn create_song_thing(song_id: &str) -> Thing {
    create_thing("song", song_id)
}

pub fn create_playlist_thing(playlist_id: &str) -> Thing {
    create_thing("playlist", playlist_id)
}

pub fn create_genre_thing(genre_id: &str) -> Thing {
    create_thing("genre", genre_id)
}

/// Bare record key, as exposed to API clients.
pub fn thing_to_id(thing: &Thing) -> String {
    thing.id.to_raw()
}

pub fn opt_thing_to_id(thing: &Option<Thing>) -> String {
    thing.as_ref().map(thing_to_id).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_part() {
        assert_eq!(parse_id_part("user:123"), "123");
        assert_eq!(parse_id_part("123"), "123");
        assert_eq!(parse_id_part("playlist:test_playlist"), "test_playlist");
    }

    #[test]
    fn test_create_things() {
        let user_thing = create_user_thing("user:12");
        assert_eq!(user_thing.tb, "user");
        assert_eq!(thing_to_id(&user_thing), "12");

        let song_thing = create_song_thing("56");
        assert_eq!(song_thing.tb, "song");
        assert_eq!(song_thing.id.to_string(), "⟨56⟩");

        let genre_thing = create_genre_thing("genre:rock");
        assert_eq!(genre_thing.tb, "genre");
        assert_eq!(thing_to_id(&genre_thing), "rock");
    }

    #[test]
    fn test_opt_thing_to_id() {
        assert_eq!(opt_thing_to_id(&None), "");
        assert_eq!(opt_thing_to_id(&Some(create_playlist_thing("p1"))), "p1");
    }
}
