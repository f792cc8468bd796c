use rusqlite::Connection;

/// Creates the menu schema if missing. The fetcher is the only writer; the
/// app backend reads these tables.
pub fn check_or_create_db_tables(conn: &Connection) -> rusqlite::Result<()> {
    // persisted dishes, keyed by the deterministic title hash
    conn.prepare(
        "create table if not exists dishes (
            id text not null primary key,
            dish_type text not null,
            dish_category text not null,
            labels text not null,
            price_simple text
        )",
    )?
    .execute([])?;

    // one row per (dish, tier)
    conn.prepare(
        "create table if not exists dish_prices (
            dish_id text not null,
            tier text not null,
            base_price real,
            price_per_unit real,
            unit text,
            primary key (dish_id, tier),
            foreign key (dish_id) references dishes(id)
        )",
    )?
    .execute([])?;

    conn.prepare(
        "create table if not exists dish_translations (
            dish_id text not null,
            language text not null,
            title text not null,
            primary key (dish_id, language),
            foreign key (dish_id) references dishes(id)
        )",
    )?
    .execute([])?;

    // one row per (date, canteen) in the fetch window; rows exist even for
    // days without dishes so "nothing served" and "not yet checked" differ
    conn.prepare(
        "create table if not exists menu_days (
            date text not null,
            canteen_id text not null,
            is_closed integer not null,
            primary key (date, canteen_id)
        )",
    )?
    .execute([])?;

    conn.prepare(
        "create table if not exists menu_dish_associations (
            dish_id text not null,
            menu_day_date text not null,
            canteen_id text not null,
            primary key (dish_id, menu_day_date, canteen_id),
            foreign key (dish_id) references dishes(id)
        )",
    )?
    .execute([])?;

    Ok(())
}

#[cfg(test)]
pub fn open_test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    check_or_create_db_tables(&conn).unwrap();
    conn
}
